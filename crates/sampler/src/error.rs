//! Scheduler errors.

use core::convert::Infallible;

use platform::ChainError;

/// Everything a scheduler operation can reject.
///
/// `E` is the error type of the peripheral the operation drives: the timer
/// for [`Sampler::new`](crate::Sampler::new), the transfer channel for the
/// lifecycle transitions. Pure validation uses the default, [`Infallible`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SamplerError<E = Infallible> {
    /// A rate of 0 Hz.
    #[error("sample rate must be non-zero")]
    ZeroRate,
    /// The timer reports no running input clock.
    #[error("timer clock is not running")]
    ClockUnavailable,
    /// The rate exceeds the timer clock, leaving an empty period.
    #[error("rate {rate_hz} Hz exceeds timer clock {clock_hz} Hz")]
    RateAboveClock {
        /// Requested rate.
        rate_hz: u32,
        /// Timer clock.
        clock_hz: u32,
    },
    /// The acquisition window does not end inside the period.
    #[error("acquisition window of {compare} ticks does not fit a {period} tick period")]
    AcquisitionTooLong {
        /// Compare threshold, saturated to `u32`.
        compare: u32,
        /// Period in ticks.
        period: u32,
    },
    /// More channels than one scan supports.
    #[error("{requested} channels requested, at most {max} supported")]
    TooManyChannels {
        /// Requested channel count.
        requested: u8,
        /// Supported maximum.
        max: u8,
    },
    /// The target holds fewer slots than the scan writes.
    #[error("target holds {len} samples, scan writes {channels}")]
    TargetTooShort {
        /// Target slots.
        len: usize,
        /// Channel count.
        channels: u8,
    },
    /// No target bound yet.
    #[error("no acquisition target configured")]
    NotConfigured,
    /// The scan covers zero channels.
    #[error("channel count is zero")]
    NoChannels,
    /// The converter has no result register for a scanned channel.
    #[error("converter has no result register {0}")]
    NoResultRegister(u8),
    /// The streaming descriptor could not be formed.
    #[error("stream descriptor rejected: {0}")]
    Chain(ChainError),
    /// The timer refused initialization.
    #[error("timer failed: {0:?}")]
    Timer(E),
    /// The transfer channel failed.
    #[error("transfer channel failed: {0:?}")]
    Channel(E),
}

impl SamplerError {
    /// Reinterpret a peripheral-free error as one carrying peripheral errors `E`.
    #[must_use]
    pub fn widen<E>(self) -> SamplerError<E> {
        match self {
            Self::ZeroRate => SamplerError::ZeroRate,
            Self::ClockUnavailable => SamplerError::ClockUnavailable,
            Self::RateAboveClock { rate_hz, clock_hz } => {
                SamplerError::RateAboveClock { rate_hz, clock_hz }
            }
            Self::AcquisitionTooLong { compare, period } => {
                SamplerError::AcquisitionTooLong { compare, period }
            }
            Self::TooManyChannels { requested, max } => {
                SamplerError::TooManyChannels { requested, max }
            }
            Self::TargetTooShort { len, channels } => {
                SamplerError::TargetTooShort { len, channels }
            }
            Self::NotConfigured => SamplerError::NotConfigured,
            Self::NoChannels => SamplerError::NoChannels,
            Self::NoResultRegister(channel) => SamplerError::NoResultRegister(channel),
            Self::Chain(error) => SamplerError::Chain(error),
            Self::Timer(never) | Self::Channel(never) => match never {},
        }
    }
}
