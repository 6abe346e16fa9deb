//! Descriptor ring that steps the multiplexer autonomously.
//!
//! Each connection `i` gets a pair of descriptors:
//!
//! ```text
//! [2i]    write 0 → register of connection i-1 (wrapping)   Chain   next = 2i+1
//! [2i+1]  write value of connection i → its register        Element next = 2(i+1) mod 2K
//! ```
//!
//! One trigger therefore releases the previous pin and routes the next one,
//! and leaves the channel parked on the following pair.

use heapless::Vec;
use platform::{ChainError, Descriptor, DescriptorId, TriggerMode};

use crate::config::GPIO_CODE;
use crate::routing::Connection;

/// Fill `ring` with one descriptor pair per connection. On error `ring` is
/// left empty.
pub(crate) fn build<const N: usize>(
    ring: &mut Vec<[Descriptor; 2], N>,
    connections: &[Connection],
) -> Result<(), ChainError> {
    ring.clear();
    let built = fill(ring, connections);
    if built.is_err() {
        ring.clear();
    }
    built
}

fn fill<const N: usize>(
    ring: &mut Vec<[Descriptor; 2], N>,
    connections: &[Connection],
) -> Result<(), ChainError> {
    let last = connections.len().checked_sub(1).ok_or(ChainError::Empty)?;
    let mut previous = connections.get(last).ok_or(ChainError::Empty)?;
    for (index, connection) in connections.iter().enumerate() {
        let pair = pair(index, connections.len(), previous, connection)?;
        ring.push(pair).map_err(|_| ChainError::TooLong)?;
        previous = connection;
    }
    Ok(())
}

fn pair(
    index: usize,
    len: usize,
    previous: &Connection,
    connection: &Connection,
) -> Result<[Descriptor; 2], ChainError> {
    let clear_at = index.checked_mul(2).ok_or(ChainError::TooLong)?;
    let set_at = clear_at.checked_add(1).ok_or(ChainError::TooLong)?;
    let following = match index.checked_add(1) {
        Some(next) if next < len => next.checked_mul(2).ok_or(ChainError::TooLong)?,
        _ => 0,
    };
    let id = |at: usize| DescriptorId::from_index(at).ok_or(ChainError::TooLong);

    let clear = Descriptor::register_write(previous.register(), GPIO_CODE)
        .with_trigger(TriggerMode::Chain)
        .with_next(Some(id(set_at)?));
    let set = Descriptor::register_write(connection.register(), connection.value())
        .with_trigger(TriggerMode::Element)
        .with_next(Some(id(following)?));
    Ok([clear, set])
}
