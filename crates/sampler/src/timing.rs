//! Timer period and compare threshold for a scan rate.
//!
//! ```text
//! counter  0 ──────────── compare ─────────────── period → 0
//!          │◄── acquisition ──►│◄── conversion ──►│
//!                          compare event      rollover event
//! ```

use crate::config::{HZ_PER_MHZ, MHZ_ROUNDING, NS_PER_US};
use crate::error::SamplerError;

/// Programmed timing of one conversion period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanTiming {
    /// Timer input clock.
    pub clock_hz: u32,
    /// Requested conversions per second.
    pub rate_hz: u32,
    /// Requested acquisition window.
    pub acquisition_ns: u32,
    /// Timer counts per conversion.
    pub period_ticks: u32,
    /// Timer count at which the acquisition window ends.
    pub compare_ticks: u32,
}

impl ScanTiming {
    /// Derive period and compare threshold.
    ///
    /// `period = clock / rate`, truncating. The compare threshold uses the
    /// clock rounded to whole MHz: `((clock + 0.5 MHz) / 1 MHz × ns) / 1000`.
    pub fn compute(clock_hz: u32, rate_hz: u32, acquisition_ns: u32) -> Result<Self, SamplerError> {
        if rate_hz == 0 {
            return Err(SamplerError::ZeroRate);
        }
        if clock_hz == 0 {
            return Err(SamplerError::ClockUnavailable);
        }
        let period_ticks = clock_hz
            .checked_div(rate_hz)
            .filter(|&ticks| ticks > 0)
            .ok_or(SamplerError::RateAboveClock { rate_hz, clock_hz })?;

        let mhz = u64::from(clock_hz)
            .saturating_add(MHZ_ROUNDING)
            .checked_div(HZ_PER_MHZ)
            .unwrap_or(0);
        let compare = mhz
            .checked_mul(u64::from(acquisition_ns))
            .and_then(|ticks| ticks.checked_div(NS_PER_US))
            .unwrap_or(u64::MAX);
        let compare_ticks = u32::try_from(compare)
            .ok()
            .filter(|&ticks| ticks < period_ticks)
            .ok_or(SamplerError::AcquisitionTooLong {
                compare: u32::try_from(compare).unwrap_or(u32::MAX),
                period: period_ticks,
            })?;

        Ok(Self {
            clock_hz,
            rate_hz,
            acquisition_ns,
            period_ticks,
            compare_ticks,
        })
    }

    /// Conversions per second the period actually yields.
    #[must_use]
    pub fn achieved_rate_hz(&self) -> u32 {
        self.clock_hz.checked_div(self.period_ticks).unwrap_or(0)
    }

    /// Full scans per second when `channels` conversions make one scan.
    #[must_use]
    pub fn scan_rate_hz(&self, channels: u8) -> Option<u32> {
        self.achieved_rate_hz().checked_div(u32::from(channels))
    }
}
