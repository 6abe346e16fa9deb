//! Scheduler lifecycle and streaming against simulated hardware.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::arithmetic_side_effects)]

use platform::mocks::{MockConverter, MockError, MockHardware, MockTimer, Origin};
use platform::{
    ChannelId, DataWidth, DescriptorId, Endpoint, TimerEvent, TransferChannel, TriggerMode,
};
use proptest::prelude::*;
use sampler::config::{DEFAULT_ACQUISITION_NS, DEFAULT_RATE_HZ, MAX_CHANNELS};
use sampler::{AcquisitionTarget, Sampler, SamplerError, State, StreamLayout};
use static_cell::StaticCell;

const STREAM_CHANNEL: ChannelId = ChannelId::new(1, 0);

fn scheduler(hw: &MockHardware) -> Sampler<MockConverter, MockTimer> {
    Sampler::new(hw.converter(), hw.timer()).unwrap()
}

/// A fresh `'static` buffer the simulated engine may write into.
fn target(hw: &MockHardware, len: usize) -> AcquisitionTarget {
    target_from(hw, Box::leak(vec![0i16; len].into_boxed_slice()))
}

fn target_from(hw: &MockHardware, buffer: &'static mut [i16]) -> AcquisitionTarget {
    let len = buffer.len();
    let target = AcquisitionTarget::new(buffer);
    // SAFETY: the buffer is leaked and only read back through the target.
    unsafe { hw.map_ram(target.address(), len * 2) };
    target
}

fn stream_writes(hw: &MockHardware) -> usize {
    hw.writes()
        .iter()
        .filter(|w| w.origin == Origin::Engine(STREAM_CHANNEL))
        .count()
}

fn snapshot(sampler: &Sampler<MockConverter, MockTimer, impl State>) -> Vec<i16> {
    let mut out = vec![0; usize::from(sampler.channels())];
    let copied = sampler.samples(&mut out);
    out.truncate(copied);
    out
}

#[test]
fn new_initializes_a_free_running_timer() {
    let hw = MockHardware::new();
    let sampler = scheduler(&hw);
    let timer = hw.timer_state();
    assert!(timer.initialized);
    assert!(!timer.enabled);
    assert_eq!((timer.period, timer.compare), (32_768, 16_384));
    assert_eq!(sampler.channels(), 0);
    assert!(sampler.target().is_none());
    assert_eq!(sampler.layout(), StreamLayout::Burst);
}

#[test]
fn new_hands_peripherals_back_when_the_timer_refuses() {
    let hw = MockHardware::new();
    hw.refuse_timer_init(true);
    let rejected = Sampler::new(hw.converter(), hw.timer()).unwrap_err();
    assert_eq!(rejected.error, SamplerError::Timer(MockError::InitRefused));
    assert!(!hw.timer_state().initialized);

    hw.refuse_timer_init(false);
    let (converter, timer) = rejected.handle;
    assert!(Sampler::new(converter, timer).is_ok());
}

#[test]
fn set_rate_programs_the_reference_timing() {
    let hw = MockHardware::new();
    let mut sampler = scheduler(&hw);
    let timing = sampler.set_rate(DEFAULT_RATE_HZ, DEFAULT_ACQUISITION_NS).unwrap();
    assert_eq!(timing.period_ticks, 108);
    assert_eq!(timing.compare_ticks, 18);
    assert_eq!(sampler.timing(), Some(timing));

    let timer = hw.timer_state();
    assert_eq!((timer.period, timer.compare), (108, 18));
}

#[test]
fn rejected_rates_leave_the_timer_untouched() {
    let hw = MockHardware::new();
    let mut sampler = scheduler(&hw);
    let before = hw.timer_state();

    assert_eq!(sampler.set_rate(0, 180), Err(SamplerError::ZeroRate));
    hw.set_clock(None);
    assert_eq!(sampler.set_rate(1_000, 180), Err(SamplerError::ClockUnavailable));
    hw.set_clock(Some(0));
    assert_eq!(sampler.set_rate(1_000, 180), Err(SamplerError::ClockUnavailable));
    hw.set_clock(Some(1_000));
    assert_eq!(
        sampler.set_rate(2_000, 0),
        Err(SamplerError::RateAboveClock { rate_hz: 2_000, clock_hz: 1_000 })
    );
    hw.set_clock(Some(100_000_000));
    assert!(matches!(
        sampler.set_rate(10_000_000, 1_000),
        Err(SamplerError::AcquisitionTooLong { period: 10, .. })
    ));

    assert_eq!(hw.timer_state(), before);
    assert_eq!(sampler.timing(), None);
}

#[test]
fn configure_validates_channels_and_target() {
    let hw = MockHardware::new();
    let mut sampler = scheduler(&hw);

    let rejected = sampler.configure(MAX_CHANNELS + 1, target(&hw, 64)).unwrap_err();
    assert_eq!(
        rejected.error,
        SamplerError::TooManyChannels { requested: 33, max: 32 }
    );
    assert_eq!(rejected.handle.len(), 64);

    let rejected = sampler.configure(4, target(&hw, 3)).unwrap_err();
    assert_eq!(rejected.error, SamplerError::TargetTooShort { len: 3, channels: 4 });
    assert_eq!(sampler.channels(), 0);

    assert!(sampler.configure(4, target(&hw, 4)).unwrap().is_none());
    let previous = sampler.configure(2, target(&hw, 8)).unwrap().unwrap();
    assert_eq!(previous.len(), 4);
    assert_eq!(sampler.channels(), 2);
    assert_eq!(sampler.target().map(AcquisitionTarget::len), Some(8));
}

#[test]
fn setup_requires_a_target_and_channels() {
    let hw = MockHardware::new();
    let channel = hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel);

    let rejected = scheduler(&hw).setup_autonomous(channel).unwrap_err();
    assert_eq!(rejected.error, SamplerError::NotConfigured);
    let (mut sampler, channel) = rejected.handle;

    sampler.configure(0, target(&hw, 4)).unwrap();
    let rejected = sampler.setup_autonomous(channel).unwrap_err();
    assert_eq!(rejected.error, SamplerError::NoChannels);
    assert!(!hw.channel(STREAM_CHANNEL).unwrap().installed);
}

#[test]
fn burst_needs_a_result_register_per_channel() {
    let hw = MockHardware::new();
    let mut sampler = scheduler(&hw);
    sampler.configure(MAX_CHANNELS, target(&hw, 32)).unwrap();
    let channel = hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel);

    let rejected = sampler.setup_autonomous(channel).unwrap_err();
    assert_eq!(rejected.error, SamplerError::NoResultRegister(31));

    // One input behind the multiplexer reads register 0 only.
    let (mut sampler, channel) = rejected.handle;
    sampler.set_layout(StreamLayout::Multiplexed);
    let armed = sampler.setup_autonomous(channel).unwrap();
    assert_eq!(armed.stream().unwrap().count, 32);
}

#[test]
fn refused_install_hands_both_back() {
    let hw = MockHardware::new();
    hw.refuse_install(STREAM_CHANNEL);
    let mut sampler = scheduler(&hw);
    sampler.configure(4, target(&hw, 4)).unwrap();

    let channel = hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel);
    let rejected = sampler.setup_autonomous(channel).unwrap_err();
    assert_eq!(
        rejected.error,
        SamplerError::Channel(MockError::InstallRefused(STREAM_CHANNEL))
    );
    let (sampler, channel) = rejected.handle;
    assert!(sampler.stream().is_none());
    assert_eq!(channel.id(), STREAM_CHANNEL);
}

#[test]
fn setup_installs_a_disabled_self_looping_stream() {
    let hw = MockHardware::new();
    let mut sampler = scheduler(&hw);
    let target = target(&hw, 4);
    let slot0 = target.address();
    sampler.configure(4, target).unwrap();
    let armed = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap();

    let installed = hw.installed(STREAM_CHANNEL);
    assert_eq!(installed.len(), 1);
    let stream = installed[0];
    assert_eq!(Some(&stream), armed.stream());
    assert_eq!(stream.src, Endpoint::Address(MockHardware::CONVERTER_RESULTS));
    assert_eq!(stream.dst, slot0);
    assert_eq!((stream.src_width, stream.dst_width), (DataWidth::Word, DataWidth::HalfWord));
    assert_eq!((stream.src_step, stream.dst_step, stream.count), (1, 1, 4));
    assert_eq!(stream.trigger, TriggerMode::Descriptor);
    assert_eq!(stream.next, Some(DescriptorId::HEAD));

    let channel = hw.channel(STREAM_CHANNEL).unwrap();
    assert!(!channel.enabled);
    assert_eq!(channel.config.unwrap().priority, 3);
}

#[test]
fn one_period_copies_every_result_into_its_slot() {
    static BUFFER: StaticCell<[i16; 4]> = StaticCell::new();

    let hw = MockHardware::new();
    hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);
    for (channel, sample) in [(0, 110), (1, -220), (2, 330), (3, i16::MIN)] {
        hw.set_result(channel, sample);
    }
    hw.set_result(4, 999);

    let mut sampler = scheduler(&hw);
    sampler.set_rate(DEFAULT_RATE_HZ, DEFAULT_ACQUISITION_NS).unwrap();
    sampler.configure(4, target_from(&hw, BUFFER.init([0; 4]))).unwrap();
    let running = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap()
        .start()
        .unwrap();

    let timer = hw.timer_state();
    assert!(timer.running);
    assert_eq!(timer.start_triggers, 1);
    assert!(hw.converter_state().enabled);
    assert!(hw.channel(STREAM_CHANNEL).unwrap().enabled);

    hw.clear_writes();
    hw.tick();
    assert_eq!(stream_writes(&hw), 4);
    assert_eq!(snapshot(&running), [110, -220, 330, i16::MIN]);
    assert_eq!(hw.channel(STREAM_CHANNEL).unwrap().position, Some(DescriptorId::HEAD));

    // Next period overwrites in place.
    hw.set_result(1, 7);
    hw.tick();
    assert_eq!(stream_writes(&hw), 8);
    assert_eq!(snapshot(&running), [110, 7, 330, i16::MIN]);
}

#[test]
fn multiplexed_stream_fills_one_slot_per_period() {
    let hw = MockHardware::new();
    hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);

    let mut sampler = scheduler(&hw);
    sampler.set_layout(StreamLayout::Multiplexed);
    sampler.configure(3, target(&hw, 3)).unwrap();
    let running = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap()
        .start()
        .unwrap();

    for (period, sample) in [11, 22, 33].into_iter().enumerate() {
        hw.set_result(0, sample);
        hw.tick();
        assert_eq!(hw.channel(STREAM_CHANNEL).unwrap().element, ((period + 1) % 3) as u16);
    }
    assert_eq!(snapshot(&running), [11, 22, 33]);

    // Reloaded: the fourth period lands in slot 0 again.
    hw.set_result(0, 44);
    hw.tick();
    assert_eq!(snapshot(&running), [44, 22, 33]);
}

#[test]
fn stop_halts_channel_converter_and_timer() {
    let hw = MockHardware::new();
    hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);
    hw.set_result(0, 5);

    let mut sampler = scheduler(&hw);
    sampler.configure(1, target(&hw, 1)).unwrap();
    let running = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap()
        .start()
        .unwrap();
    hw.tick();

    let mut stopped = running.stop().unwrap();
    assert!(!hw.channel(STREAM_CHANNEL).unwrap().enabled);
    assert!(!hw.converter_state().enabled);
    let timer = hw.timer_state();
    assert!(!timer.enabled && !timer.running);

    let periods = timer.periods;
    hw.set_result(0, 6);
    hw.tick();
    assert_eq!(hw.timer_state().periods, periods);
    assert_eq!(snapshot(&stopped), [5]);

    // Armed again: timing may change before restarting.
    stopped.set_rate(1_000, 180).unwrap();
    let running = stopped.start().unwrap();
    assert_eq!(hw.timer_state().counter, 0);
    hw.tick();
    assert_eq!(snapshot(&running), [6]);
}

#[test]
fn teardown_hands_everything_back() {
    let hw = MockHardware::new();
    hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);
    hw.set_result(0, -1);
    hw.set_result(1, -2);

    let mut sampler = scheduler(&hw);
    sampler.configure(2, target(&hw, 2)).unwrap();
    let running = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap()
        .start()
        .unwrap();
    hw.tick();

    let (parts, channel) = running.teardown().unwrap();
    assert_eq!(channel.id(), STREAM_CHANNEL);
    let snapshot = hw.channel(STREAM_CHANNEL).unwrap();
    assert!(!snapshot.installed);
    assert_eq!(snapshot.releases, 1);
    assert!(!hw.timer_state().initialized);
    assert_eq!(parts.target.unwrap().into_buffer(), [-1, -2]);

    // The returned peripherals build a new scheduler.
    let sampler = Sampler::new(parts.converter, parts.timer).unwrap();
    assert!(hw.timer_state().initialized);
    let parts = sampler.teardown();
    assert!(parts.target.is_none());
    assert!(!hw.timer_state().initialized);
}

#[test]
fn refused_release_leaves_a_stopped_sampler_armed() {
    let hw = MockHardware::new();
    hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);
    hw.set_result(0, 12);

    let mut sampler = scheduler(&hw);
    sampler.configure(1, target(&hw, 1)).unwrap();
    let running = sampler
        .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
        .unwrap()
        .start()
        .unwrap();
    hw.refuse_release(STREAM_CHANNEL);

    let rejected = running.teardown().err().unwrap();
    assert_eq!(
        rejected.error,
        SamplerError::Channel(MockError::ReleaseRefused(STREAM_CHANNEL))
    );
    let armed = rejected.handle.armed().unwrap();
    assert!(!hw.channel(STREAM_CHANNEL).unwrap().enabled);
    assert!(!hw.converter_state().enabled);
    let timer = hw.timer_state();
    assert!(timer.initialized && !timer.enabled);

    // Still holding its chain, so it starts again.
    let running = armed.start().unwrap();
    hw.tick();
    assert_eq!(snapshot(&running), [12]);
}

proptest! {
    #[test]
    fn period_is_clock_over_rate(clock in 1_000_000u32..=250_000_000, rate in 1u32..=1_000_000) {
        let hw = MockHardware::new();
        hw.set_clock(Some(clock));
        let mut sampler = scheduler(&hw);
        let timing = sampler.set_rate(rate, 0).unwrap();
        prop_assert_eq!(timing.period_ticks, clock / rate);
        prop_assert_eq!(hw.timer_state().period, clock / rate);
        prop_assert_eq!(timing.compare_ticks, 0);
    }

    #[test]
    fn accepted_compare_falls_inside_the_period(rate in 1u32..=5_000_000, ns in 0u32..=100_000) {
        let hw = MockHardware::new();
        let mut sampler = scheduler(&hw);
        let before = hw.timer_state();
        match sampler.set_rate(rate, ns) {
            Ok(timing) => {
                prop_assert!(timing.compare_ticks < timing.period_ticks);
                prop_assert_eq!(hw.timer_state().compare, timing.compare_ticks);
            }
            Err(error) => {
                let is_too_long = matches!(error, SamplerError::AcquisitionTooLong { .. });
                prop_assert!(is_too_long);
                prop_assert_eq!(hw.timer_state(), before);
            }
        }
    }

    #[test]
    fn set_rate_programs_clock_over_rate_or_nothing(
        clock in 1u32..=250_000_000,
        rate in 1u32..=u32::MAX,
        ns in any::<u32>(),
    ) {
        let hw = MockHardware::new();
        hw.set_clock(Some(clock));
        let mut sampler = scheduler(&hw);
        let before = hw.timer_state();
        match sampler.set_rate(rate, ns) {
            Ok(timing) => {
                prop_assert_eq!(timing.period_ticks, clock / rate);
                prop_assert_eq!(hw.timer_state().period, clock / rate);
            }
            Err(SamplerError::RateAboveClock { .. }) => {
                prop_assert!(rate > clock);
                prop_assert_eq!(hw.timer_state(), before);
            }
            Err(SamplerError::AcquisitionTooLong { compare, period }) => {
                prop_assert_eq!(period, clock / rate);
                prop_assert!(compare >= period);
                prop_assert_eq!(hw.timer_state(), before);
            }
            Err(other) => prop_assert!(false, "unexpected {:?}", other),
        }
    }

    #[test]
    fn burst_preserves_channel_order(samples in prop::collection::vec(any::<i16>(), 1..=16)) {
        let hw = MockHardware::new();
        hw.wire(TimerEvent::Rollover, STREAM_CHANNEL);
        for (channel, sample) in samples.iter().enumerate() {
            hw.set_result(channel as u8, *sample);
        }
        let channels = samples.len() as u8;

        let mut sampler = scheduler(&hw);
        sampler.configure(channels, target(&hw, samples.len())).unwrap();
        let running = sampler
            .setup_autonomous(hw.dma_channel(STREAM_CHANNEL.instance, STREAM_CHANNEL.channel))
            .unwrap()
            .start()
            .unwrap();
        hw.tick();
        prop_assert_eq!(snapshot(&running), samples);
    }
}
