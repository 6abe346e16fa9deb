//! Descriptor chains executed by the simulated transfer engine, plus the
//! ownership helpers drivers build their lifecycles from.

#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]
#![allow(clippy::arithmetic_side_effects)]

use platform::mocks::{MockHardware, Origin};
use platform::{
    Address, Armed, ChannelConfig, ChannelId, Configuring, Descriptor, DescriptorChain,
    DescriptorId, Rejected, State, TransferChannel, TriggerMode, Unwound,
};
use proptest::prelude::*;

const BASE: Address = Address::new(0x4000_0000);

/// `len` single-word writes to consecutive registers, looping back to 0.
fn ring(len: u16, trigger: TriggerMode) -> Vec<Descriptor> {
    (0..len)
        .map(|i| {
            let dst = BASE.offset(usize::from(i) * 4).unwrap();
            Descriptor::register_write(dst, u32::from(i) + 1)
                .with_trigger(trigger)
                .with_next(Some(DescriptorId::new((i + 1) % len)))
        })
        .collect()
}

fn engine_writes(hw: &MockHardware, id: ChannelId) -> Vec<(Address, u32)> {
    hw.writes()
        .iter()
        .filter(|w| w.origin == Origin::Engine(id))
        .map(|w| (w.address, w.value))
        .collect()
}

#[test]
fn rewind_restarts_from_the_given_descriptor() {
    let hw = MockHardware::new();
    let mut channel = hw.dma_channel(1, 2);
    let descriptors = ring(4, TriggerMode::Element);
    let chain = DescriptorChain::new(&descriptors, DescriptorId::HEAD).unwrap();
    channel.install(&chain, &ChannelConfig::with_priority(1)).unwrap();
    channel.enable().unwrap();

    hw.trigger(channel.id());
    hw.trigger(channel.id());
    channel.rewind(DescriptorId::new(3)).unwrap();
    hw.trigger(channel.id());
    hw.trigger(channel.id());

    let values: Vec<u32> = engine_writes(&hw, channel.id()).iter().map(|w| w.1).collect();
    assert_eq!(values, [1, 2, 4, 1]);
    assert_eq!(hw.channel(channel.id()).unwrap().config.unwrap().priority, 1);
}

#[test]
fn install_copies_the_chain() {
    let hw = MockHardware::new();
    let mut channel = hw.dma_channel(0, 0);
    let mut descriptors = ring(2, TriggerMode::Element);
    {
        let chain = DescriptorChain::new(&descriptors, DescriptorId::HEAD).unwrap();
        channel.install(&chain, &ChannelConfig::default()).unwrap();
    }
    descriptors[0] = Descriptor::register_write(BASE, 0xDEAD);
    channel.enable().unwrap();
    hw.trigger(channel.id());
    assert_eq!(hw.read(BASE), 1);
}

#[test]
fn release_forgets_the_chain() {
    let hw = MockHardware::new();
    let mut channel = hw.dma_channel(0, 0);
    let descriptors = ring(3, TriggerMode::Element);
    let chain = DescriptorChain::new(&descriptors, DescriptorId::HEAD).unwrap();
    channel.install(&chain, &ChannelConfig::default()).unwrap();
    channel.enable().unwrap();
    channel.release().unwrap();

    hw.trigger(channel.id());
    assert!(engine_writes(&hw, channel.id()).is_empty());
    assert!(hw.installed(channel.id()).is_empty());
    assert!(channel.enable().is_err());
}

#[test]
fn priority_is_clamped() {
    assert_eq!(ChannelConfig::with_priority(9).priority, ChannelConfig::LOWEST_PRIORITY);
    assert_eq!(ChannelConfig::default().priority, 3);
    assert!(!ChannelConfig::default().preemptable);
}

#[test]
fn rejected_returns_the_handle() {
    let rejected: Rejected<u8, &str> = Rejected::new(7, "busy");
    assert_eq!(rejected.to_string(), "rejected: busy");
    let rejected = rejected.map_handle(u16::from).map_error(str::len);
    assert_eq!(rejected.into_parts(), (7u16, 4));
}

#[test]
fn lifecycle_markers_carry_the_channel() {
    assert_eq!(Configuring::NAME, "configuring");
    let armed = Armed::new(ChannelId::new(0, 5));
    assert_eq!(<Armed<ChannelId> as State>::NAME, "armed");
    let mut running = armed.run();
    running.channel_mut().channel = 6;
    let armed = running.halt();
    assert_eq!(armed.into_channel(), ChannelId::new(0, 6));

    let stopped: Unwound<&str, u8> = Unwound::Armed(3);
    assert_eq!(stopped.armed(), Some(3));
    let still_running: Unwound<&str, u8> = Unwound::Running("busy");
    assert_eq!(still_running.armed(), None);
}

proptest! {
    #[test]
    fn element_ring_visits_each_descriptor_in_turn(len in 1u16..24, triggers in 0usize..100) {
        let hw = MockHardware::new();
        let mut channel = hw.dma_channel(0, 3);
        let descriptors = ring(len, TriggerMode::Element);
        let chain = DescriptorChain::new(&descriptors, DescriptorId::HEAD).unwrap();
        prop_assert_eq!(chain.cycle_len(DescriptorId::HEAD), Some(usize::from(len)));
        channel.install(&chain, &ChannelConfig::default()).unwrap();
        channel.enable().unwrap();

        for _ in 0..triggers {
            hw.trigger(channel.id());
        }
        let values: Vec<u32> = engine_writes(&hw, channel.id()).iter().map(|w| w.1).collect();
        let expected: Vec<u32> = (0..triggers).map(|n| (n % usize::from(len)) as u32 + 1).collect();
        prop_assert_eq!(values, expected);
    }

    #[test]
    fn chained_pairs_complete_two_descriptors_per_trigger(pairs in 1u16..12, triggers in 1usize..40) {
        let hw = MockHardware::new();
        let mut channel = hw.dma_channel(0, 4);
        let mut descriptors = ring(pairs * 2, TriggerMode::Element);
        for pair in descriptors.chunks_mut(2) {
            pair[0].trigger = TriggerMode::Chain;
        }
        let chain = DescriptorChain::new(&descriptors, DescriptorId::HEAD).unwrap();
        channel.install(&chain, &ChannelConfig::default()).unwrap();
        channel.enable().unwrap();

        for _ in 0..triggers {
            hw.trigger(channel.id());
        }
        let snapshot = hw.channel(channel.id()).unwrap();
        prop_assert_eq!(snapshot.completed, 2 * triggers as u64);
        let position = (2 * triggers) % usize::from(pairs * 2);
        prop_assert_eq!(snapshot.position, DescriptorId::from_index(position));
    }
}
