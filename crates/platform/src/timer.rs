//! Timer/counter abstraction.
//!
//! The acquisition pipeline needs a free-running counter with one compare
//! match per period. Both the compare match and the rollover are routed, in
//! hardware, to transfer engine trigger inputs.

/// Counter clock divider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// ÷1
    #[default]
    Div1,
    /// ÷2
    Div2,
    /// ÷4
    Div4,
    /// ÷8
    Div8,
    /// ÷16
    Div16,
    /// ÷32
    Div32,
    /// ÷64
    Div64,
    /// ÷128
    Div128,
}

impl Prescaler {
    /// Division factor.
    #[must_use]
    pub const fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div32 => 32,
            Self::Div64 => 64,
            Self::Div128 => 128,
        }
    }
}

/// Counting direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CountDirection {
    /// 0 → period, then roll over to 0.
    #[default]
    Up,
    /// period → 0, then reload.
    Down,
}

/// What the counter does at the end of a period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunMode {
    /// Keep counting.
    #[default]
    Continuous,
    /// Stop after one period.
    OneShot,
}

/// Events a counter can route to trigger outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerEvent {
    /// Counter reached the compare value.
    Compare,
    /// Counter wrapped at the end of the period.
    Rollover,
}

/// Counter configuration applied by [`TimerCounter::init`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CounterConfig {
    /// Counts per period.
    pub period: u32,
    /// Compare match value.
    pub compare: u32,
    /// Clock divider.
    pub prescaler: Prescaler,
    /// Counting direction.
    pub direction: CountDirection,
    /// End-of-period behaviour.
    pub run_mode: RunMode,
}

impl CounterConfig {
    /// Power-on period.
    pub const DEFAULT_PERIOD: u32 = 32_768;
    /// Power-on compare value (half period).
    pub const DEFAULT_COMPARE: u32 = 16_384;
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            period: Self::DEFAULT_PERIOD,
            compare: Self::DEFAULT_COMPARE,
            prescaler: Prescaler::Div1,
            direction: CountDirection::Up,
            run_mode: RunMode::Continuous,
        }
    }
}

/// A timer/counter peripheral channel.
pub trait TimerCounter {
    /// Error type
    type Error: core::fmt::Debug;

    /// Configure the counter. It stays disabled.
    fn init(&mut self, config: &CounterConfig) -> Result<(), Self::Error>;

    /// Return the counter to its reset state.
    fn deinit(&mut self);

    /// Start counting on the next start trigger.
    fn enable(&mut self);

    /// Stop counting.
    fn disable(&mut self);

    /// Program the period register.
    fn set_period(&mut self, period: u32);

    /// Program the compare register.
    fn set_compare(&mut self, compare: u32);

    /// Load the counter register.
    fn set_counter(&mut self, value: u32);

    /// Issue a software start trigger.
    fn trigger_start(&mut self);

    /// Frequency of the counter's input clock, if it is running.
    fn clock_hz(&self) -> Option<u32>;
}
