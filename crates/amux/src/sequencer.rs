//! Connection sequencer typestate machine.
//!
//! ```text
//! [Configuring] --arm(channel)--> [Armed] --start()--> [Running]
//!       ▲                            │  ▲                  │
//!       └──────── teardown() ────────┘  └───── stop() ─────┘
//! ```
//!
//! CPU-side stepping (`connect`, `connect_next`, `disconnect_all`) exists in
//! `Configuring` and `Armed` only. While `Running` the transfer engine owns
//! the select registers, so calling them is a compile error.
//!
//! At most one connection of the set is routed at any time: every routing
//! write is preceded by releasing whatever the cursor says is routed, or by a
//! full release when the cursor is unknown.

use heapless::Vec;
use platform::{
    Armed, Configuring, Descriptor, DescriptorChain, DescriptorId, Idle, RegisterBus, Rejected,
    Running, State, TransferChannel, Unwound,
};

use crate::config::{CHANNEL_CONFIG, GPIO_CODE, MAX_CONNECTIONS};
use crate::error::AmuxError;
use crate::ring;
use crate::routing::{Bank, Connection, Port, RoutingLayout, SubRegister};

// ── Cursor ───────────────────────────────────────────────────────────────────

/// Which connection the sequencer believes is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cursor {
    /// Nothing known; the next step must release every register first.
    Unknown,
    /// Position of the routed connection, or after a full release, the
    /// position that precedes position 0.
    At(usize),
}

impl Cursor {
    /// Position, if known.
    #[must_use]
    pub const fn position(self) -> Option<usize> {
        match self {
            Self::Unknown => None,
            Self::At(position) => Some(position),
        }
    }
}

// ── Sequencer ────────────────────────────────────────────────────────────────

/// Connection sequencer for one analog bus.
///
/// `B` writes the select registers, `S` is the typestate and `N` caps the
/// connection set (and the descriptor ring at `2 × N`).
pub struct Amux<B, S = Configuring, const N: usize = { MAX_CONNECTIONS }> {
    bus: B,
    bank: Bank,
    layout: RoutingLayout,
    connections: Vec<Connection, N>,
    cursor: Cursor,
    ring: Vec<[Descriptor; 2], N>,
    state: S,
}

impl<B, S: State, const N: usize> Amux<B, S, N> {
    /// Analog bus this sequencer routes to.
    pub fn bank(&self) -> Bank {
        self.bank
    }

    /// Register geometry in use.
    pub fn layout(&self) -> &RoutingLayout {
        &self.layout
    }

    /// The connection set, in scan order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Connections in the set.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Maximum connections.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Current cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Installed descriptor ring; empty until armed.
    pub fn ring(&self) -> &[Descriptor] {
        self.ring.as_flattened()
    }
}

impl<B, S, const N: usize> Amux<B, S, N> {
    fn into_state<T>(self, state: T) -> (Amux<B, T, N>, S) {
        let Self {
            bus,
            bank,
            layout,
            connections,
            cursor,
            ring,
            state: previous,
        } = self;
        (
            Amux {
                bus,
                bank,
                layout,
                connections,
                cursor,
                ring,
                state,
            },
            previous,
        )
    }

    fn map_state<T>(self, f: impl FnOnce(S) -> T) -> Amux<B, T, N> {
        let (amux, previous) = self.into_state(());
        let (amux, ()) = amux.into_state(f(previous));
        amux
    }
}

impl<B: RegisterBus, S: State, const N: usize> Amux<B, S, N> {
    /// Release every register the set uses. Consecutive connections on the
    /// same register share one write.
    fn release_all(&mut self) {
        let mut previous = None;
        for connection in &self.connections {
            let register = connection.register();
            if previous != Some(register) {
                self.bus.write(register, GPIO_CODE);
            }
            previous = Some(register);
        }
        self.cursor = match self.connections.len().checked_sub(1) {
            Some(last) => Cursor::At(last),
            None => Cursor::Unknown,
        };
    }

    /// Back to a freshly created sequencer.
    fn reset(self) -> Amux<B, Configuring, N> {
        let (mut amux, _) = self.into_state(Configuring);
        amux.connections.clear();
        amux.ring.clear();
        amux.cursor = Cursor::Unknown;
        amux
    }
}

// ── Configuring ──────────────────────────────────────────────────────────────

impl<B: RegisterBus, const N: usize> Amux<B, Configuring, N> {
    /// Sequencer on `bank` with the PSoC 6 register layout and an empty set.
    pub fn new(bus: B, bank: Bank) -> Self {
        Self::with_layout(bus, bank, RoutingLayout::PSOC6)
    }

    /// Sequencer on `bank` with a custom register layout.
    pub fn with_layout(bus: B, bank: Bank, layout: RoutingLayout) -> Self {
        Self {
            bus,
            bank,
            layout,
            connections: Vec::new(),
            cursor: Cursor::Unknown,
            ring: Vec::new(),
            state: Configuring,
        }
    }

    /// Append one connection per set bit of `mask`, lowest pin first, and
    /// return how many were added.
    ///
    /// Nothing is appended if the set lacks room for all of them. On success
    /// both select registers of the port are reset to plain GPIO, so no pin
    /// of the port stays on any bus.
    pub fn add_port(&mut self, port: Port, mask: u8) -> Result<usize, AmuxError> {
        let mut pending: Vec<Connection, 8> = Vec::new();
        for pin in 0..self.layout.pins_per_port.min(8) {
            if mask.checked_shr(u32::from(pin)).map_or(0, |bits| bits & 1) == 0 {
                continue;
            }
            let connection = self
                .layout
                .connection(port, pin, self.bank)
                .ok_or(AmuxError::InvalidPort(port.number()))?;
            pending
                .push(connection)
                .map_err(|_| AmuxError::InvalidPort(port.number()))?;
        }

        let available = N.saturating_sub(self.connections.len());
        if pending.len() > available {
            warn!(
                "amux: port {} needs {} slots, {} left",
                port.number(),
                pending.len(),
                available
            );
            return Err(AmuxError::CapacityExceeded {
                requested: pending.len(),
                available,
            });
        }

        let sel0 = self.layout.register(port, SubRegister::Sel0);
        let sel1 = self.layout.register(port, SubRegister::Sel1);
        let (Some(sel0), Some(sel1)) = (sel0, sel1) else {
            return Err(AmuxError::InvalidPort(port.number()));
        };

        for connection in &pending {
            self.connections
                .push(*connection)
                .map_err(|_| AmuxError::CapacityExceeded {
                    requested: pending.len(),
                    available,
                })?;
        }
        self.bus.write(sel0, GPIO_CODE);
        self.bus.write(sel1, GPIO_CODE);

        debug!(
            "amux: port {} mask {:#x} -> {} connections",
            port.number(),
            mask,
            self.connections.len()
        );
        Ok(pending.len())
    }

    /// Hand the ring to `channel` and leave it disabled at descriptor 0.
    ///
    /// Releases every connection first. On failure the sequencer and the
    /// channel come back unchanged.
    pub fn arm<C: TransferChannel>(
        mut self,
        mut channel: C,
    ) -> Result<Amux<B, Armed<C>, N>, Rejected<(Self, C), AmuxError<C::Error>>> {
        if self.connections.is_empty() {
            warn!("amux: refusing to arm an empty connection set");
            return Err(Rejected::new((self, channel), AmuxError::Empty));
        }
        if let Err(error) = ring::build(&mut self.ring, &self.connections) {
            return Err(Rejected::new((self, channel), AmuxError::Chain(error)));
        }

        self.release_all();
        self.cursor = Cursor::Unknown;

        let installed = DescriptorChain::new(self.ring.as_flattened(), DescriptorId::HEAD)
            .map_err(AmuxError::Chain)
            .and_then(|chain| {
                channel
                    .install(&chain, &CHANNEL_CONFIG)
                    .map_err(AmuxError::Channel)
            });
        if let Err(error) = installed {
            warn!("amux: channel {} refused the ring", channel.id());
            self.ring.clear();
            return Err(Rejected::new((self, channel), error));
        }

        info!(
            "amux: armed {} connections ({} descriptors) on {}",
            self.connections.len(),
            self.ring.as_flattened().len(),
            channel.id()
        );
        Ok(self.into_state(Armed::new(channel)).0)
    }

    /// Release every connection and empty the set.
    #[must_use]
    pub fn teardown(mut self) -> Self {
        self.release_all();
        self.reset()
    }

    /// Give back the register bus.
    pub fn release(self) -> B {
        self.bus
    }
}

// ── CPU-side stepping (Configuring, Armed) ───────────────────────────────────

impl<B: RegisterBus, S: Idle, const N: usize> Amux<B, S, N> {
    /// Route connection `position`, releasing whatever was routed before.
    pub fn connect(&mut self, position: usize) -> Result<(), AmuxError> {
        let Some(target) = self.connections.get(position).copied() else {
            return Err(AmuxError::IndexOutOfRange {
                index: position,
                len: self.connections.len(),
            });
        };
        self.release_current();
        self.bus.write(target.register(), target.value());
        self.cursor = Cursor::At(position);
        trace!("amux: connect {}", position);
        Ok(())
    }

    /// Route the connection after the current one, wrapping to 0, and return
    /// its position. From an unknown cursor this routes position 0.
    pub fn connect_next(&mut self) -> Result<usize, AmuxError> {
        if self.connections.is_empty() {
            return Err(AmuxError::Empty);
        }
        self.release_current();
        let next = match self.cursor.position().and_then(|p| p.checked_add(1)) {
            Some(next) if next < self.connections.len() => next,
            _ => 0,
        };
        let Some(target) = self.connections.get(next).copied() else {
            return Err(AmuxError::Empty);
        };
        self.bus.write(target.register(), target.value());
        self.cursor = Cursor::At(next);
        trace!("amux: connect_next {}", next);
        Ok(next)
    }

    /// Release every connection. The cursor moves to the last position, so
    /// the next [`connect_next`](Self::connect_next) routes position 0.
    pub fn disconnect_all(&mut self) {
        self.release_all();
    }

    fn release_current(&mut self) {
        match self.cursor {
            Cursor::Unknown => self.release_all(),
            Cursor::At(position) => {
                if let Some(current) = self.connections.get(position) {
                    self.bus.write(current.register(), GPIO_CODE);
                }
            }
        }
    }
}

// ── Armed ────────────────────────────────────────────────────────────────────

impl<B: RegisterBus, C: TransferChannel, const N: usize> Amux<B, Armed<C>, N> {
    /// Channel holding the ring.
    pub fn channel(&self) -> &C {
        self.state.channel()
    }

    /// Hand stepping to the transfer engine.
    ///
    /// Releases every connection, rewinds the channel to descriptor 0 and
    /// enables it. The first trigger then routes connection 0.
    pub fn start(
        mut self,
    ) -> Result<Amux<B, Running<C>, N>, Rejected<Self, AmuxError<C::Error>>> {
        self.release_all();
        self.cursor = Cursor::Unknown;
        let channel = self.state.channel_mut();
        if let Err(error) = channel.rewind(DescriptorId::HEAD).and_then(|()| channel.enable()) {
            warn!("amux: channel {} failed to start", channel.id());
            return Err(Rejected::new(self, AmuxError::Channel(error)));
        }
        info!("amux: running on {}", self.state.channel().id());
        Ok(self.map_state(Armed::run))
    }

    /// Release every connection, free the channel and return to an empty
    /// configuring sequencer.
    pub fn teardown(
        mut self,
    ) -> Result<(Amux<B, Configuring, N>, C), Rejected<Self, AmuxError<C::Error>>> {
        self.release_all();
        let channel = self.state.channel_mut();
        if let Err(error) = channel.disable().and_then(|()| channel.release()) {
            return Err(Rejected::new(self, AmuxError::Channel(error)));
        }
        info!("amux: torn down, released {}", self.state.channel().id());
        let (amux, armed) = self.into_state(Configuring);
        Ok((amux.reset(), armed.into_channel()))
    }
}

// ── Running ──────────────────────────────────────────────────────────────────

impl<B: RegisterBus, C: TransferChannel, const N: usize> Amux<B, Running<C>, N> {
    /// Channel holding the ring.
    pub fn channel(&self) -> &C {
        self.state.channel()
    }

    /// Disable the channel immediately. Whatever the engine last routed stays
    /// routed and the cursor becomes unknown.
    pub fn stop(mut self) -> Result<Amux<B, Armed<C>, N>, Rejected<Self, AmuxError<C::Error>>> {
        if let Err(error) = self.state.channel_mut().disable() {
            return Err(Rejected::new(self, AmuxError::Channel(error)));
        }
        self.cursor = Cursor::Unknown;
        info!("amux: stopped {}", self.state.channel().id());
        Ok(self.map_state(Running::halt))
    }

    /// Stop, then tear down.
    ///
    /// A rejection carries the handle in the state the failure left it: still
    /// running if the stop failed, armed if the channel refused to release.
    #[allow(clippy::type_complexity)]
    pub fn teardown(
        self,
    ) -> Result<
        (Amux<B, Configuring, N>, C),
        Rejected<Unwound<Self, Amux<B, Armed<C>, N>>, AmuxError<C::Error>>,
    > {
        let armed = self.stop().map_err(|rejected| rejected.map_handle(Unwound::Running))?;
        armed
            .teardown()
            .map_err(|rejected| rejected.map_handle(Unwound::Armed))
    }
}

impl<B, S: State, const N: usize> core::fmt::Debug for Amux<B, S, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Amux")
            .field("state", &S::NAME)
            .field("bank", &self.bank)
            .field("connections", &self.connections.len())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}
