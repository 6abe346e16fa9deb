//! Acquisition scheduler typestate machine.
//!
//! ```text
//! [Configuring] --setup_autonomous(channel)--> [Armed] --start()--> [Running]
//!       ▲                                         │  ▲                  │
//!       └────────────── teardown() ───────────────┘  └───── stop() ─────┘
//! ```
//!
//! The timer paces everything. Its rollover event triggers the stream
//! channel once per period; its compare event, at the end of the
//! acquisition window, is free to step a connection sequencer.

use platform::{
    Armed, Configuring, Converter, CounterConfig, Descriptor, DescriptorChain, DescriptorId, Idle,
    Rejected, Running, State, TimerCounter, TransferChannel, Unwound,
};

use crate::config::{CHANNEL_CONFIG, MAX_CHANNELS};
use crate::error::SamplerError;
use crate::stream::{self, StreamLayout};
use crate::target::AcquisitionTarget;
use crate::timing::ScanTiming;

/// Peripherals handed back by a teardown.
#[derive(Debug)]
pub struct Parts<A, T> {
    /// The converter.
    pub converter: A,
    /// The timer, de-initialized.
    pub timer: T,
    /// The bound target, if any. Safe to reclaim: nothing streams into it.
    pub target: Option<AcquisitionTarget>,
}

/// Timer-paced scheduler streaming converter results into a target buffer.
///
/// `A` is the converter, `T` the timer pacing it and `S` the typestate.
pub struct Sampler<A, T, S = Configuring> {
    converter: A,
    timer: T,
    channels: u8,
    target: Option<AcquisitionTarget>,
    layout: StreamLayout,
    timing: Option<ScanTiming>,
    stream: Option<Descriptor>,
    state: S,
}

impl<A, T, S: State> Sampler<A, T, S> {
    /// Channels per scan; 0 until configured.
    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Result-to-slot mapping.
    pub fn layout(&self) -> StreamLayout {
        self.layout
    }

    /// Last timing programmed by [`set_rate`](Self::set_rate).
    pub fn timing(&self) -> Option<ScanTiming> {
        self.timing
    }

    /// Installed stream descriptor; `None` until set up.
    pub fn stream(&self) -> Option<&Descriptor> {
        self.stream.as_ref()
    }

    /// Bound target.
    pub fn target(&self) -> Option<&AcquisitionTarget> {
        self.target.as_ref()
    }

    /// Copy the latest samples into `out`; returns how many were copied.
    pub fn samples(&self, out: &mut [i16]) -> usize {
        let Some(target) = &self.target else {
            return 0;
        };
        let count = out.len().min(usize::from(self.channels));
        out.get_mut(..count).map_or(0, |out| target.read(out))
    }
}

impl<A, T, S> Sampler<A, T, S> {
    fn into_state<U>(self, state: U) -> (Sampler<A, T, U>, S) {
        let Self {
            converter,
            timer,
            channels,
            target,
            layout,
            timing,
            stream,
            state: previous,
        } = self;
        (
            Sampler {
                converter,
                timer,
                channels,
                target,
                layout,
                timing,
                stream,
                state,
            },
            previous,
        )
    }

    fn map_state<U>(self, f: impl FnOnce(S) -> U) -> Sampler<A, T, U> {
        let (sampler, previous) = self.into_state(());
        let (sampler, ()) = sampler.into_state(f(previous));
        sampler
    }

    fn into_parts(self) -> Parts<A, T> {
        Parts {
            converter: self.converter,
            timer: self.timer,
            target: self.target,
        }
    }
}

// ── Configuring ──────────────────────────────────────────────────────────────

impl<A: Converter, T: TimerCounter> Sampler<A, T, Configuring> {
    /// Take the converter and timer, and initialize the timer as a
    /// continuous up-counter with the power-on period and compare value.
    ///
    /// If the timer refuses, both peripherals come back.
    pub fn new(converter: A, mut timer: T) -> Result<Self, Rejected<(A, T), SamplerError<T::Error>>> {
        let counter = CounterConfig::default();
        if let Err(error) = timer.init(&counter) {
            warn!("sampler: timer refused initialization");
            return Err(Rejected::new((converter, timer), SamplerError::Timer(error)));
        }
        debug!(
            "sampler: timer initialized, period {} compare {}",
            counter.period,
            counter.compare
        );
        Ok(Self {
            converter,
            timer,
            channels: 0,
            target: None,
            layout: StreamLayout::default(),
            timing: None,
            stream: None,
            state: Configuring,
        })
    }

    /// Bind `channels` and the buffer the scan streams into. Returns the
    /// previously bound target.
    ///
    /// On failure the target comes back and nothing changes.
    pub fn configure(
        &mut self,
        channels: u8,
        target: AcquisitionTarget,
    ) -> Result<Option<AcquisitionTarget>, Rejected<AcquisitionTarget, SamplerError>> {
        if channels > MAX_CHANNELS {
            return Err(Rejected::new(
                target,
                SamplerError::TooManyChannels {
                    requested: channels,
                    max: MAX_CHANNELS,
                },
            ));
        }
        if target.len() < usize::from(channels) {
            let len = target.len();
            return Err(Rejected::new(target, SamplerError::TargetTooShort { len, channels }));
        }
        self.channels = channels;
        debug!("sampler: {} channels into {} slots", channels, target.len());
        Ok(self.target.replace(target))
    }

    /// Choose how results map onto target slots.
    pub fn set_layout(&mut self, layout: StreamLayout) {
        self.layout = layout;
    }

    /// Install the stream descriptor on `channel` and leave it disabled.
    ///
    /// On failure the scheduler and the channel come back unchanged.
    pub fn setup_autonomous<C: TransferChannel>(
        mut self,
        mut channel: C,
    ) -> Result<Sampler<A, T, Armed<C>>, Rejected<(Self, C), SamplerError<C::Error>>> {
        let descriptor = match self.stream_descriptor() {
            Ok(descriptor) => descriptor,
            Err(error) => {
                warn!("sampler: cannot build stream descriptor");
                return Err(Rejected::new((self, channel), error.widen()));
            }
        };
        let stream = [descriptor];
        let installed = DescriptorChain::new(&stream, DescriptorId::HEAD)
            .map_err(SamplerError::Chain)
            .and_then(|chain| {
                channel
                    .install(&chain, &CHANNEL_CONFIG)
                    .map_err(SamplerError::Channel)
            });
        if let Err(error) = installed {
            warn!("sampler: channel {} refused the stream", channel.id());
            return Err(Rejected::new((self, channel), error));
        }

        self.stream = Some(descriptor);
        info!(
            "sampler: armed {} channels on {}",
            self.channels,
            channel.id()
        );
        Ok(self.into_state(Armed::new(channel)).0)
    }

    /// Stop and de-initialize the timer and hand back every peripheral.
    pub fn teardown(mut self) -> Parts<A, T> {
        self.timer.disable();
        self.timer.deinit();
        self.into_parts()
    }

    fn stream_descriptor(&self) -> Result<Descriptor, SamplerError> {
        let target = self.target.as_ref().ok_or(SamplerError::NotConfigured)?;
        let last = self
            .layout
            .result_registers(self.channels)
            .checked_sub(1)
            .ok_or(SamplerError::NoChannels)?;
        let results = self
            .converter
            .result_address(0)
            .ok_or(SamplerError::NoResultRegister(0))?;
        if self.converter.result_address(last).is_none() {
            return Err(SamplerError::NoResultRegister(last));
        }
        Ok(stream::descriptor(
            self.layout,
            results,
            target.address(),
            u16::from(self.channels),
        ))
    }
}

// ── Timing (Configuring, Armed) ──────────────────────────────────────────────

impl<A, T: TimerCounter, S: Idle> Sampler<A, T, S> {
    /// Program the timer for `rate_hz` conversions per second, with the
    /// compare event `acquisition_ns` into each period.
    ///
    /// The period is `clock / rate_hz`, truncated, whenever the call
    /// succeeds. Besides a zero rate and a stopped clock, two settings the
    /// timer cannot express are rejected rather than programmed:
    ///
    /// - [`SamplerError::RateAboveClock`]: the period would be 0 ticks.
    /// - [`SamplerError::AcquisitionTooLong`]: the compare threshold would
    ///   not fall strictly inside the period, including thresholds beyond
    ///   `u32`.
    ///
    /// The timer is left untouched on failure.
    pub fn set_rate(&mut self, rate_hz: u32, acquisition_ns: u32) -> Result<ScanTiming, SamplerError> {
        if rate_hz == 0 {
            return Err(SamplerError::ZeroRate);
        }
        let clock_hz = self
            .timer
            .clock_hz()
            .filter(|&hz| hz > 0)
            .ok_or(SamplerError::ClockUnavailable)?;
        let timing = ScanTiming::compute(clock_hz, rate_hz, acquisition_ns)?;
        self.timer.set_period(timing.period_ticks);
        self.timer.set_compare(timing.compare_ticks);
        self.timing = Some(timing);
        debug!(
            "sampler: {} Hz -> period {} compare {}",
            rate_hz,
            timing.period_ticks,
            timing.compare_ticks
        );
        Ok(timing)
    }
}

// ── Armed ────────────────────────────────────────────────────────────────────

impl<A: Converter, T: TimerCounter, C: TransferChannel> Sampler<A, T, Armed<C>> {
    /// Channel holding the stream.
    pub fn channel(&self) -> &C {
        self.state.channel()
    }

    /// Start converting: enable the converter and the stream channel, then
    /// start the timer from 0.
    ///
    /// The channel resumes where it stopped. A multiplexed stream halted
    /// mid-lap carries on at the next slot, in step with a sequencer paced
    /// by the same timer.
    ///
    /// If the channel fails the converter is disabled again and the timer
    /// never starts.
    pub fn start(
        mut self,
    ) -> Result<Sampler<A, T, Running<C>>, Rejected<Self, SamplerError<C::Error>>> {
        self.converter.enable();
        let channel = self.state.channel_mut();
        if let Err(error) = channel.enable() {
            warn!("sampler: channel {} failed to start", channel.id());
            self.converter.disable();
            return Err(Rejected::new(self, SamplerError::Channel(error)));
        }
        self.timer.set_counter(0);
        self.timer.enable();
        self.timer.trigger_start();
        info!("sampler: running on {}", self.state.channel().id());
        Ok(self.map_state(Armed::run))
    }

    /// Free the channel, stop and de-initialize the timer and hand back
    /// every peripheral.
    ///
    /// The channel goes first, so a channel failure leaves the scheduler
    /// armed and restartable.
    pub fn teardown(mut self) -> Result<(Parts<A, T>, C), Rejected<Self, SamplerError<C::Error>>> {
        let channel = self.state.channel_mut();
        if let Err(error) = channel.disable().and_then(|()| channel.release()) {
            return Err(Rejected::new(self, SamplerError::Channel(error)));
        }
        self.timer.disable();
        self.timer.deinit();
        info!("sampler: torn down, released {}", self.state.channel().id());
        let (mut sampler, armed) = self.into_state(Configuring);
        sampler.stream = None;
        Ok((sampler.into_parts(), armed.into_channel()))
    }
}

// ── Running ──────────────────────────────────────────────────────────────────

impl<A: Converter, T: TimerCounter, C: TransferChannel> Sampler<A, T, Running<C>> {
    /// Channel holding the stream.
    pub fn channel(&self) -> &C {
        self.state.channel()
    }

    /// Disable the channel, the converter and the timer, in that order.
    pub fn stop(mut self) -> Result<Sampler<A, T, Armed<C>>, Rejected<Self, SamplerError<C::Error>>> {
        if let Err(error) = self.state.channel_mut().disable() {
            return Err(Rejected::new(self, SamplerError::Channel(error)));
        }
        self.converter.disable();
        self.timer.disable();
        info!("sampler: stopped {}", self.state.channel().id());
        Ok(self.map_state(Running::halt))
    }

    /// Stop, then tear down.
    ///
    /// A rejection carries the handle in the state the failure left it: still
    /// running if the stop failed, armed (converter and timer off) if the
    /// channel refused to release.
    #[allow(clippy::type_complexity)]
    pub fn teardown(
        self,
    ) -> Result<
        (Parts<A, T>, C),
        Rejected<Unwound<Self, Sampler<A, T, Armed<C>>>, SamplerError<C::Error>>,
    > {
        let armed = self.stop().map_err(|rejected| rejected.map_handle(Unwound::Running))?;
        armed
            .teardown()
            .map_err(|rejected| rejected.map_handle(Unwound::Armed))
    }
}

impl<A, T, S: State> core::fmt::Debug for Sampler<A, T, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Sampler")
            .field("state", &S::NAME)
            .field("channels", &self.channels)
            .field("layout", &self.layout)
            .field("timing", &self.timing)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
