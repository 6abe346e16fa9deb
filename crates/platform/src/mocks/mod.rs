//! Simulated acquisition hardware for tests.
//!
//! [`MockHardware`] owns one shared simulation: word-addressed register
//! memory, a transfer engine that executes installed descriptor chains, a
//! timer whose events can be wired to channel trigger inputs, and a converter
//! that samples whichever analog input is currently routed to it.
//!
//! The per-peripheral handles ([`MockBus`], [`MockChannel`], [`MockTimer`],
//! [`MockConverter`]) are what drivers consume; the `MockHardware` itself stays
//! with the test for wiring, stepping and inspection.
//!
//! ```text
//! tick():  compare event ──► channels wired to Compare
//!          converter samples the routed input into result[0]
//!          rollover event ──► channels wired to Rollover
//! ```

#![cfg(any(test, feature = "std"))]
// Simulation bookkeeping counters; they cannot realistically overflow in a test.
#![allow(clippy::arithmetic_side_effects)]

use std::{cell::RefCell, collections::BTreeMap, rc::Rc, vec::Vec};

use crate::{
    converter::{Converter, RESULT_STRIDE},
    descriptor::{DataWidth, Descriptor, DescriptorChain, DescriptorId, Endpoint, TriggerMode},
    register::{Address, RegisterBus},
    timer::{CounterConfig, TimerCounter, TimerEvent},
    transfer::{ChannelConfig, ChannelId, TransferChannel},
};

// ── Public records ───────────────────────────────────────────────────────────

/// Who performed a logged write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// A driver through [`MockBus`].
    Cpu,
    /// The transfer engine executing a descriptor on this channel.
    Engine(ChannelId),
}

/// One write observed by the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    /// Writer.
    pub origin: Origin,
    /// Target byte address.
    pub address: Address,
    /// Value written, already truncated to the write width.
    pub value: u32,
}

/// An analog signal that reaches the converter while a routing field holds
/// a given value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalogInput {
    /// Routing register controlling the switch.
    pub register: Address,
    /// Field of the switch inside `register`.
    pub mask: u32,
    /// Field value that closes the switch.
    pub selected: u32,
    /// Level the converter reads through the closed switch.
    pub sample: i16,
}

/// Errors reported by simulated peripherals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror_no_std::Error)]
pub enum MockError {
    /// Channel installation was configured to fail.
    #[error("channel {0} refused the descriptor chain")]
    InstallRefused(ChannelId),
    /// The channel has no installed chain.
    #[error("channel {0} has no installed chain")]
    NotInstalled(ChannelId),
    /// Channel release was configured to fail.
    #[error("channel {0} refused to release")]
    ReleaseRefused(ChannelId),
    /// Timer initialization was configured to fail.
    #[error("timer refused initialization")]
    InitRefused,
}

/// State of one simulated channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// A chain is installed.
    pub installed: bool,
    /// Triggers are accepted.
    pub enabled: bool,
    /// Current descriptor, `None` once a chain ran off its end.
    pub position: Option<DescriptorId>,
    /// Elements already moved by the current descriptor.
    pub element: u16,
    /// Settings from the last install.
    pub config: Option<ChannelConfig>,
    /// Descriptors completed since install.
    pub completed: u64,
    /// Times the channel was released.
    pub releases: u32,
}

/// State of the simulated timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// `init` succeeded and `deinit` has not run since.
    pub initialized: bool,
    /// Counting is enabled.
    pub enabled: bool,
    /// Counting has been started by a start trigger.
    pub running: bool,
    /// Period register.
    pub period: u32,
    /// Compare register.
    pub compare: u32,
    /// Counter register.
    pub counter: u32,
    /// Software start triggers issued.
    pub start_triggers: u32,
    /// Completed periods.
    pub periods: u64,
}

/// State of the simulated converter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConverterSnapshot {
    /// Conversions are accepted.
    pub enabled: bool,
    /// Conversions performed.
    pub conversions: u64,
    /// Conversions that saw more than one input routed at once.
    pub collisions: u64,
}

// ── Simulation state ─────────────────────────────────────────────────────────

#[derive(Default)]
struct ChannelSim {
    descriptors: Vec<Descriptor>,
    position: Option<DescriptorId>,
    element: u16,
    enabled: bool,
    installed: bool,
    config: Option<ChannelConfig>,
    completed: u64,
    releases: u32,
}

struct TimerSim {
    initialized: bool,
    enabled: bool,
    running: bool,
    period: u32,
    compare: u32,
    counter: u32,
    start_triggers: u32,
    periods: u64,
    clock_hz: Option<u32>,
    refuse_init: bool,
}

#[derive(Default)]
struct ConverterSim {
    enabled: bool,
    inputs: Vec<AnalogInput>,
    conversions: u64,
    collisions: u64,
}

#[derive(Clone, Copy)]
struct RamWindow {
    base: usize,
    len: usize,
}

impl RamWindow {
    fn contains(self, address: Address, width: DataWidth) -> bool {
        let start = address.get();
        let Some(end) = start.checked_add(width.bytes()) else {
            return false;
        };
        start >= self.base && end <= self.base + self.len
    }
}

struct SimState {
    memory: BTreeMap<usize, u32>,
    log: Vec<WriteRecord>,
    ram: Vec<RamWindow>,
    channels: BTreeMap<ChannelId, ChannelSim>,
    wiring: Vec<(TimerEvent, ChannelId)>,
    refused_installs: Vec<ChannelId>,
    refused_releases: Vec<ChannelId>,
    timer: TimerSim,
    converter: ConverterSim,
}

impl SimState {
    fn new() -> Self {
        let defaults = CounterConfig::default();
        Self {
            memory: BTreeMap::new(),
            log: Vec::new(),
            ram: Vec::new(),
            channels: BTreeMap::new(),
            wiring: Vec::new(),
            refused_installs: Vec::new(),
            refused_releases: Vec::new(),
            timer: TimerSim {
                initialized: false,
                enabled: false,
                running: false,
                period: defaults.period,
                compare: defaults.compare,
                counter: 0,
                start_triggers: 0,
                periods: 0,
                clock_hz: Some(MockHardware::DEFAULT_CLOCK_HZ),
                refuse_init: false,
            },
            converter: ConverterSim::default(),
        }
    }

    fn window(&self, address: Address, width: DataWidth) -> bool {
        self.ram.iter().any(|w| w.contains(address, width))
    }

    fn load(&self, address: Address, width: DataWidth) -> u32 {
        if self.window(address, width) {
            let ptr = address.get();
            // SAFETY: `map_ram` callers guarantee the window is valid for reads.
            return unsafe {
                match width {
                    DataWidth::Byte => u32::from(core::ptr::read_volatile(ptr as *const u8)),
                    DataWidth::HalfWord => {
                        u32::from(core::ptr::read_unaligned(ptr as *const u16))
                    }
                    DataWidth::Word => core::ptr::read_unaligned(ptr as *const u32),
                }
            };
        }
        let (aligned, shift) = lane(address);
        let word = self.memory.get(&aligned).copied().unwrap_or(0);
        word.checked_shr(shift).unwrap_or(0) & width.mask()
    }

    fn poke(&mut self, address: Address, width: DataWidth, value: u32) {
        let value = value & width.mask();
        if self.window(address, width) {
            let ptr = address.get();
            #[allow(clippy::cast_possible_truncation)]
            // SAFETY: `map_ram` callers guarantee the window is valid for writes.
            unsafe {
                match width {
                    DataWidth::Byte => core::ptr::write_volatile(ptr as *mut u8, value as u8),
                    DataWidth::HalfWord => {
                        core::ptr::write_unaligned(ptr as *mut u16, value as u16);
                    }
                    DataWidth::Word => core::ptr::write_unaligned(ptr as *mut u32, value),
                }
            }
            return;
        }
        let (aligned, shift) = lane(address);
        let field = width.mask().checked_shl(shift).unwrap_or(0);
        let word = self.memory.entry(aligned).or_insert(0);
        *word = (*word & !field) | (value.checked_shl(shift).unwrap_or(0) & field);
    }

    fn store(&mut self, origin: Origin, address: Address, width: DataWidth, value: u32) {
        self.poke(address, width, value);
        self.log.push(WriteRecord {
            origin,
            address,
            value: value & width.mask(),
        });
    }

    fn wired(&self, event: TimerEvent) -> Vec<ChannelId> {
        self.wiring
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, id)| *id)
            .collect()
    }

    /// One trigger on `id`.
    fn fire(&mut self, id: ChannelId) {
        let budget = match self.channels.get(&id) {
            Some(ch) if ch.installed && ch.enabled => ch.descriptors.len(),
            _ => return,
        };
        // A chain-mode trigger visits each descriptor at most once.
        for _ in 0..budget {
            let Some(channel) = self.channels.get(&id) else {
                return;
            };
            let Some(position) = channel.position else {
                return;
            };
            let Some(descriptor) = channel.descriptors.get(position.index()).copied() else {
                return;
            };
            let first = channel.element;
            let last = match descriptor.trigger {
                TriggerMode::Element => first + 1,
                TriggerMode::Descriptor | TriggerMode::Chain => descriptor.count,
            };
            for element in first..last {
                self.move_element(id, &descriptor, element);
            }
            let Some(channel) = self.channels.get_mut(&id) else {
                return;
            };
            if last < descriptor.count {
                channel.element = last;
                return;
            }
            channel.element = 0;
            channel.position = descriptor.next;
            channel.completed += 1;
            if descriptor.trigger != TriggerMode::Chain {
                return;
            }
        }
    }

    fn move_element(&mut self, id: ChannelId, descriptor: &Descriptor, element: u16) {
        let value = match descriptor.src {
            Endpoint::Immediate(value) => value,
            Endpoint::Address(_) => match descriptor.src_address(element) {
                Some(src) => self.load(src, descriptor.src_width),
                None => return,
            },
        };
        if let Some(dst) = descriptor.dst_address(element) {
            self.store(Origin::Engine(id), dst, descriptor.dst_width, value);
        }
    }

    fn convert(&mut self) {
        if !self.converter.enabled {
            return;
        }
        self.converter.conversions += 1;
        if self.converter.inputs.is_empty() {
            return;
        }
        let routed: Vec<i16> = self
            .converter
            .inputs
            .iter()
            .filter(|input| self.load(input.register, DataWidth::Word) & input.mask == input.selected)
            .map(|input| input.sample)
            .collect();
        if routed.len() > 1 {
            self.converter.collisions += 1;
        }
        let sample = routed.first().copied().unwrap_or(0);
        self.poke(MockHardware::CONVERTER_RESULTS, DataWidth::Word, sign_extend(sample));
    }
}

fn lane(address: Address) -> (usize, u32) {
    let raw = address.get();
    #[allow(clippy::cast_possible_truncation)]
    let shift = ((raw & 3) * 8) as u32;
    (raw & !3, shift)
}

fn sign_extend(sample: i16) -> u32 {
    u32::from_ne_bytes(i32::from(sample).to_ne_bytes())
}

// ── MockHardware ─────────────────────────────────────────────────────────────

/// Shared handle to one simulated device.
#[derive(Clone)]
pub struct MockHardware {
    state: Rc<RefCell<SimState>>,
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHardware {
    /// Address of the converter's first result register.
    pub const CONVERTER_RESULTS: Address = Address::new(0x409D_0800);
    /// Converter result registers.
    pub const CONVERTER_CHANNELS: u8 = 16;
    /// Timer input clock unless changed with [`MockHardware::set_clock`].
    pub const DEFAULT_CLOCK_HZ: u32 = 100_000_000;

    /// Fresh device: empty memory, nothing installed, nothing wired.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new())),
        }
    }

    /// CPU register access.
    pub fn bus(&self) -> MockBus {
        MockBus {
            state: Rc::clone(&self.state),
        }
    }

    /// Handle to engine channel `instance.channel`.
    pub fn dma_channel(&self, instance: u8, channel: u8) -> MockChannel {
        let id = ChannelId::new(instance, channel);
        self.state.borrow_mut().channels.entry(id).or_default();
        MockChannel {
            id,
            state: Rc::clone(&self.state),
        }
    }

    /// The device's timer/counter.
    pub fn timer(&self) -> MockTimer {
        MockTimer {
            state: Rc::clone(&self.state),
        }
    }

    /// The device's converter.
    pub fn converter(&self) -> MockConverter {
        MockConverter {
            state: Rc::clone(&self.state),
        }
    }

    // ── Wiring and stepping ─────────────────────────────────────────────

    /// Route a timer event to a channel's trigger input.
    pub fn wire(&self, event: TimerEvent, channel: ChannelId) {
        self.state.borrow_mut().wiring.push((event, channel));
    }

    /// Deliver one trigger to `channel` directly.
    pub fn trigger(&self, channel: ChannelId) {
        self.state.borrow_mut().fire(channel);
    }

    /// Play one timer period. Does nothing unless the timer was enabled and
    /// started.
    pub fn tick(&self) {
        let mut sim = self.state.borrow_mut();
        if !sim.timer.running {
            return;
        }
        sim.timer.counter = sim.timer.compare;
        for id in sim.wired(TimerEvent::Compare) {
            sim.fire(id);
        }
        sim.convert();
        sim.timer.counter = 0;
        for id in sim.wired(TimerEvent::Rollover) {
            sim.fire(id);
        }
        sim.timer.periods += 1;
    }

    /// Play `periods` timer periods.
    pub fn run(&self, periods: usize) {
        for _ in 0..periods {
            self.tick();
        }
    }

    // ── Memory ──────────────────────────────────────────────────────────

    /// Read the word at `address` without logging.
    pub fn read(&self, address: Address) -> u32 {
        self.state.borrow().load(address, DataWidth::Word)
    }

    /// Write the word at `address` without logging.
    pub fn poke(&self, address: Address, value: u32) {
        self.state.borrow_mut().poke(address, DataWidth::Word, value);
    }

    /// Every logged write so far, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.borrow().log.clone()
    }

    /// Forget the write log.
    pub fn clear_writes(&self) {
        self.state.borrow_mut().log.clear();
    }

    /// Let engine and bus accesses inside `base..base + len` reach real memory.
    ///
    /// # Safety
    ///
    /// The range must stay valid for reads and writes, and must not be
    /// accessed through references, for as long as this simulation can touch
    /// it.
    pub unsafe fn map_ram(&self, base: Address, len: usize) {
        self.state
            .borrow_mut()
            .ram
            .push(RamWindow { base: base.get(), len });
    }

    // ── Converter inputs ────────────────────────────────────────────────

    /// Preload the result register of `channel`.
    pub fn set_result(&self, channel: u8, sample: i16) {
        let address = Self::CONVERTER_RESULTS.offset(usize::from(channel) * RESULT_STRIDE);
        if let Some(address) = address {
            self.state
                .borrow_mut()
                .poke(address, DataWidth::Word, sign_extend(sample));
        }
    }

    /// Connect an analog source behind a routing switch.
    pub fn attach_input(&self, input: AnalogInput) {
        self.state.borrow_mut().converter.inputs.push(input);
    }

    // ── Fault injection ─────────────────────────────────────────────────

    /// Make every later `install` on `channel` fail.
    pub fn refuse_install(&self, channel: ChannelId) {
        self.state.borrow_mut().refused_installs.push(channel);
    }

    /// Make every later `release` on `channel` fail. The channel keeps its
    /// chain.
    pub fn refuse_release(&self, channel: ChannelId) {
        self.state.borrow_mut().refused_releases.push(channel);
    }

    /// Make later timer `init` calls fail (or succeed again).
    pub fn refuse_timer_init(&self, refuse: bool) {
        self.state.borrow_mut().timer.refuse_init = refuse;
    }

    /// Change the timer's input clock; `None` reports it as stopped.
    pub fn set_clock(&self, hz: Option<u32>) {
        self.state.borrow_mut().timer.clock_hz = hz;
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Channel state, if a handle to it was ever created.
    pub fn channel(&self, id: ChannelId) -> Option<ChannelSnapshot> {
        self.state.borrow().channels.get(&id).map(|ch| ChannelSnapshot {
            installed: ch.installed,
            enabled: ch.enabled,
            position: ch.position,
            element: ch.element,
            config: ch.config,
            completed: ch.completed,
            releases: ch.releases,
        })
    }

    /// Descriptors currently installed on `id`.
    pub fn installed(&self, id: ChannelId) -> Vec<Descriptor> {
        self.state
            .borrow()
            .channels
            .get(&id)
            .map(|ch| ch.descriptors.clone())
            .unwrap_or_default()
    }

    /// Timer state.
    pub fn timer_state(&self) -> TimerSnapshot {
        let sim = self.state.borrow();
        let timer = &sim.timer;
        TimerSnapshot {
            initialized: timer.initialized,
            enabled: timer.enabled,
            running: timer.running,
            period: timer.period,
            compare: timer.compare,
            counter: timer.counter,
            start_triggers: timer.start_triggers,
            periods: timer.periods,
        }
    }

    /// Converter state.
    pub fn converter_state(&self) -> ConverterSnapshot {
        let sim = self.state.borrow();
        let converter = &sim.converter;
        ConverterSnapshot {
            enabled: converter.enabled,
            conversions: converter.conversions,
            collisions: converter.collisions,
        }
    }
}

impl core::fmt::Debug for MockHardware {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MockHardware")
            .field("timer", &self.timer_state())
            .field("converter", &self.converter_state())
            .finish_non_exhaustive()
    }
}

// ── Peripheral handles ───────────────────────────────────────────────────────

/// CPU-side register bus of a [`MockHardware`].
#[derive(Clone)]
pub struct MockBus {
    state: Rc<RefCell<SimState>>,
}

impl core::fmt::Debug for MockBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("MockBus")
    }
}

impl RegisterBus for MockBus {
    fn write(&mut self, address: Address, value: u32) {
        self.state
            .borrow_mut()
            .store(Origin::Cpu, address, DataWidth::Word, value);
    }

    fn read(&self, address: Address) -> u32 {
        self.state.borrow().load(address, DataWidth::Word)
    }
}

/// One simulated engine channel.
pub struct MockChannel {
    id: ChannelId,
    state: Rc<RefCell<SimState>>,
}

impl core::fmt::Debug for MockChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("MockChannel").field(&self.id).finish()
    }
}

impl MockChannel {
    fn with<R>(&self, f: impl FnOnce(&mut ChannelSim) -> R) -> R {
        let mut sim = self.state.borrow_mut();
        let channel = sim.channels.entry(self.id).or_default();
        f(channel)
    }

    fn require_installed(&self) -> Result<(), MockError> {
        if self.with(|ch| ch.installed) {
            Ok(())
        } else {
            Err(MockError::NotInstalled(self.id))
        }
    }
}

impl TransferChannel for MockChannel {
    type Error = MockError;

    fn id(&self) -> ChannelId {
        self.id
    }

    fn install(
        &mut self,
        chain: &DescriptorChain<'_>,
        config: &ChannelConfig,
    ) -> Result<(), Self::Error> {
        if self.state.borrow().refused_installs.contains(&self.id) {
            return Err(MockError::InstallRefused(self.id));
        }
        self.with(|ch| {
            ch.descriptors = chain.descriptors().to_vec();
            ch.position = Some(chain.head());
            ch.element = 0;
            ch.enabled = false;
            ch.installed = true;
            ch.config = Some(*config);
            ch.completed = 0;
        });
        Ok(())
    }

    fn rewind(&mut self, head: DescriptorId) -> Result<(), Self::Error> {
        self.require_installed()?;
        self.with(|ch| {
            ch.position = Some(head);
            ch.element = 0;
        });
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Self::Error> {
        self.require_installed()?;
        self.with(|ch| ch.enabled = true);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.with(|ch| ch.enabled = false);
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        if self.state.borrow().refused_releases.contains(&self.id) {
            return Err(MockError::ReleaseRefused(self.id));
        }
        self.with(|ch| {
            ch.descriptors.clear();
            ch.position = None;
            ch.element = 0;
            ch.enabled = false;
            ch.installed = false;
            ch.config = None;
            ch.releases += 1;
        });
        Ok(())
    }
}

/// The simulated timer/counter.
pub struct MockTimer {
    state: Rc<RefCell<SimState>>,
}

impl core::fmt::Debug for MockTimer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("MockTimer")
    }
}

impl TimerCounter for MockTimer {
    type Error = MockError;

    fn init(&mut self, config: &CounterConfig) -> Result<(), Self::Error> {
        let mut sim = self.state.borrow_mut();
        let timer = &mut sim.timer;
        if timer.refuse_init {
            return Err(MockError::InitRefused);
        }
        timer.initialized = true;
        timer.enabled = false;
        timer.running = false;
        timer.period = config.period;
        timer.compare = config.compare;
        timer.counter = 0;
        Ok(())
    }

    fn deinit(&mut self) {
        let mut sim = self.state.borrow_mut();
        let timer = &mut sim.timer;
        let defaults = CounterConfig::default();
        timer.initialized = false;
        timer.enabled = false;
        timer.running = false;
        timer.period = defaults.period;
        timer.compare = defaults.compare;
        timer.counter = 0;
    }

    fn enable(&mut self) {
        let mut sim = self.state.borrow_mut();
        let timer = &mut sim.timer;
        timer.enabled = timer.initialized;
    }

    fn disable(&mut self) {
        let mut sim = self.state.borrow_mut();
        let timer = &mut sim.timer;
        timer.enabled = false;
        timer.running = false;
    }

    fn set_period(&mut self, period: u32) {
        self.state.borrow_mut().timer.period = period;
    }

    fn set_compare(&mut self, compare: u32) {
        self.state.borrow_mut().timer.compare = compare;
    }

    fn set_counter(&mut self, value: u32) {
        self.state.borrow_mut().timer.counter = value;
    }

    fn trigger_start(&mut self) {
        let mut sim = self.state.borrow_mut();
        let timer = &mut sim.timer;
        timer.start_triggers += 1;
        if timer.enabled {
            timer.running = true;
        }
    }

    fn clock_hz(&self) -> Option<u32> {
        self.state.borrow().timer.clock_hz
    }
}

/// The simulated converter.
pub struct MockConverter {
    state: Rc<RefCell<SimState>>,
}

impl core::fmt::Debug for MockConverter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("MockConverter")
    }
}

impl Converter for MockConverter {
    fn enable(&mut self) {
        self.state.borrow_mut().converter.enabled = true;
    }

    fn disable(&mut self) {
        self.state.borrow_mut().converter.enabled = false;
    }

    fn result_address(&self, channel: u8) -> Option<Address> {
        if channel >= MockHardware::CONVERTER_CHANNELS {
            return None;
        }
        MockHardware::CONVERTER_RESULTS.offset(usize::from(channel) * RESULT_STRIDE)
    }
}
