//! Compile-time scheduler configuration.

use platform::ChannelConfig;

/// Most channels one scan may cover.
pub const MAX_CHANNELS: u8 = 32;

/// Conversions per second of the reference scan setup.
pub const DEFAULT_RATE_HZ: u32 = 920_000;

/// Acquisition (sample-and-hold) window of the reference scan setup, in ns.
pub const DEFAULT_ACQUISITION_NS: u32 = 180;

/// Transfer channel settings used for the result stream.
pub const CHANNEL_CONFIG: ChannelConfig = ChannelConfig {
    priority: ChannelConfig::LOWEST_PRIORITY,
    preemptable: false,
};

/// Added to the clock before truncating it to whole MHz.
pub(crate) const MHZ_ROUNDING: u64 = 500_000;
pub(crate) const HZ_PER_MHZ: u64 = 1_000_000;
pub(crate) const NS_PER_US: u64 = 1_000;
