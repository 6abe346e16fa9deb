//! Autonomous transfer engine channels.
//!
//! A [`TransferChannel`] is an owned handle to one channel of a DMA-style
//! engine. Drivers install a [`DescriptorChain`] on it and from then on the
//! engine walks that chain on hardware triggers with no CPU involvement.
//!
//! Lifecycle:
//! ```text
//! install ──► (disabled) ──rewind/enable──► (running) ──disable──► (disabled) ──release
//! ```

use crate::descriptor::{DescriptorChain, DescriptorId};

/// Engine instance and channel number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelId {
    /// Engine instance (DW0, DW1, ...).
    pub instance: u8,
    /// Channel within the instance.
    pub channel: u8,
}

impl ChannelId {
    /// Build a channel id.
    #[must_use]
    pub const fn new(instance: u8, channel: u8) -> Self {
        Self { instance, channel }
    }
}

impl core::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DW{}.{}", self.instance, self.channel)
    }
}

/// Per-channel arbitration settings applied at install time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelConfig {
    /// Arbitration priority, 0 (highest) to 3 (lowest).
    pub priority: u8,
    /// Whether higher-priority channels may interrupt a running descriptor.
    pub preemptable: bool,
}

impl ChannelConfig {
    /// Lowest arbitration priority.
    pub const LOWEST_PRIORITY: u8 = 3;

    /// Config with the given priority, clamped to the valid range.
    #[must_use]
    pub const fn with_priority(priority: u8) -> Self {
        let priority = if priority > Self::LOWEST_PRIORITY {
            Self::LOWEST_PRIORITY
        } else {
            priority
        };
        Self {
            priority,
            preemptable: false,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::with_priority(Self::LOWEST_PRIORITY)
    }
}

/// One channel of an autonomous transfer engine.
pub trait TransferChannel {
    /// Error type
    type Error: core::fmt::Debug;

    /// Which channel this handle controls.
    fn id(&self) -> ChannelId;

    /// Initialize the channel and program `chain` into engine descriptor
    /// memory. The channel is left disabled, positioned at `chain.head()`.
    ///
    /// The implementation copies the chain; the caller's slice may move or be
    /// dropped once this returns.
    fn install(&mut self, chain: &DescriptorChain<'_>, config: &ChannelConfig)
        -> Result<(), Self::Error>;

    /// Point the channel at `head` and reset its element progress.
    fn rewind(&mut self, head: DescriptorId) -> Result<(), Self::Error>;

    /// Accept triggers.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Ignore triggers. Takes effect immediately; an interrupted descriptor
    /// is not completed.
    fn disable(&mut self) -> Result<(), Self::Error>;

    /// De-initialize the channel and forget the installed chain.
    fn release(&mut self) -> Result<(), Self::Error>;
}
