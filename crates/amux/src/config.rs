//! Compile-time sequencer configuration.
//!
//! Register geometry matches the PSoC 6 high-speed I/O matrix (HSIOM). Every
//! port has two 32-bit select registers; each pin owns an 8-bit field that
//! picks what the pin is connected to.
//!
//! ```text
//! PORT_SEL0  [31:24 pin3][23:16 pin2][15:8 pin1][7:0 pin0]
//! PORT_SEL1  [31:24 pin7][23:16 pin6][15:8 pin5][7:0 pin4]
//! ```

use platform::ChannelConfig;

/// Connections a sequencer holds unless its capacity parameter says otherwise.
pub const MAX_CONNECTIONS: usize = 32;

/// Transfer channel settings used when arming. Lowest priority, not
/// preemptable.
pub const CHANNEL_CONFIG: ChannelConfig = ChannelConfig {
    priority: ChannelConfig::LOWEST_PRIORITY,
    preemptable: false,
};

// ── HSIOM geometry ──────────────────────────────────────────────────────────

/// Base of the HSIOM port register block.
pub const HSIOM_BASE: usize = 0x4031_0000;
/// Bytes between consecutive HSIOM port blocks.
pub const HSIOM_PORT_STRIDE: usize = 0x10;
/// Offset of PORT_SEL1 inside a port block (PORT_SEL0 sits at 0).
pub const SEL1_OFFSET: usize = 0x04;
/// Base of the GPIO port register block.
pub const GPIO_BASE: usize = 0x4032_0000;
/// Bytes between consecutive GPIO port blocks.
pub const GPIO_PORT_STRIDE: usize = 0x80;

/// Pins per port.
pub const PINS_PER_PORT: u8 = 8;
/// Pin fields per select register.
pub const PINS_PER_REGISTER: u8 = 4;
/// Width of one pin field in bits.
pub const FIELD_BITS: u8 = 8;

/// Select code that connects a pin to analog bus A.
pub const AMUXA_CODE: u32 = 4;
/// Select code that connects a pin to analog bus B.
pub const AMUXB_CODE: u32 = 5;
/// Select code of plain GPIO: the pin is on no analog bus.
pub const GPIO_CODE: u32 = 0;
