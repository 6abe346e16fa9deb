//! Sequencer errors.

use core::convert::Infallible;

use platform::ChainError;

/// Everything a sequencer operation can reject.
///
/// `E` is the transfer channel's error type. Operations that never touch the
/// channel use the default, [`Infallible`], and can be widened with
/// [`AmuxError::widen`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmuxError<E = Infallible> {
    /// Not a select code of an analog bus.
    #[error("select code {0} is not an analog bus")]
    InvalidBank(u32),
    /// The port's select registers fall outside the address space.
    #[error("port {0} has no routing registers")]
    InvalidPort(u8),
    /// Position beyond the end of the connection set.
    #[error("connection {index} out of range (set holds {len})")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Connections in the set.
        len: usize,
    },
    /// The set cannot take this many more connections.
    #[error("{requested} connections requested, {available} slots left")]
    CapacityExceeded {
        /// Connections the call would add.
        requested: usize,
        /// Free slots.
        available: usize,
    },
    /// The operation needs at least one connection.
    #[error("connection set is empty")]
    Empty,
    /// The descriptor ring could not be formed.
    #[error("descriptor ring rejected: {0}")]
    Chain(ChainError),
    /// The transfer channel failed.
    #[error("transfer channel failed: {0:?}")]
    Channel(E),
}

impl AmuxError {
    /// Reinterpret a channel-free error as one carrying channel errors `E`.
    #[must_use]
    pub fn widen<E>(self) -> AmuxError<E> {
        match self {
            Self::InvalidBank(code) => AmuxError::InvalidBank(code),
            Self::InvalidPort(port) => AmuxError::InvalidPort(port),
            Self::IndexOutOfRange { index, len } => AmuxError::IndexOutOfRange { index, len },
            Self::CapacityExceeded {
                requested,
                available,
            } => AmuxError::CapacityExceeded {
                requested,
                available,
            },
            Self::Empty => AmuxError::Empty,
            Self::Chain(error) => AmuxError::Chain(error),
            Self::Channel(never) => match never {},
        }
    }
}
