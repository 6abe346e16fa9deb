//! Analog-to-digital converter capability.

use crate::register::Address;

/// Byte stride between consecutive result registers.
pub const RESULT_STRIDE: usize = 4;

/// A converter whose per-channel results live in memory-mapped registers.
///
/// Each result register is one 32-bit word holding a sign-extended 16-bit
/// sample; consecutive channels sit [`RESULT_STRIDE`] bytes apart.
pub trait Converter {
    /// Power the converter and accept conversion triggers.
    fn enable(&mut self);

    /// Stop converting.
    fn disable(&mut self);

    /// Address of the result register of `channel`, if the channel exists.
    fn result_address(&self, channel: u8) -> Option<Address>;
}
