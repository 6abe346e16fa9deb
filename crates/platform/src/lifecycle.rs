//! Typestate markers shared by drivers that hand work to a transfer channel.
//!
//! ```text
//! [Configuring] --(install on channel)--> [Armed<C>] --(enable)--> [Running<C>]
//!       ▲                                    │  ▲                      │
//!       └────────── (release channel) ───────┘  └────── (disable) ─────┘
//! ```
//!
//! `Armed` and `Running` carry the channel itself, so a driver cannot be
//! running without owning the channel that runs it.

/// Not yet bound to a transfer channel.
#[derive(Debug)]
pub struct Configuring;

/// Work installed on channel `C`, channel disabled.
#[derive(Debug)]
pub struct Armed<C> {
    channel: C,
}

/// Channel `C` enabled; the engine is executing.
#[derive(Debug)]
pub struct Running<C> {
    channel: C,
}

impl<C> Armed<C> {
    /// Wrap an installed, disabled channel.
    pub const fn new(channel: C) -> Self {
        Self { channel }
    }

    /// The channel.
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// The channel, mutably.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The channel has been enabled.
    pub fn run(self) -> Running<C> {
        Running {
            channel: self.channel,
        }
    }

    /// Unwrap the channel.
    pub fn into_channel(self) -> C {
        self.channel
    }
}

impl<C> Running<C> {
    /// The channel.
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    /// The channel, mutably.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// The channel has been disabled.
    pub fn halt(self) -> Armed<C> {
        Armed {
            channel: self.channel,
        }
    }
}

/// What a failed teardown from `Running` leaves behind: still running if
/// the stop failed, armed if the stop went through and the release did not.
#[derive(Debug)]
pub enum Unwound<R, A> {
    /// Stopping failed; the engine may still be executing.
    Running(R),
    /// Stopped, channel disabled but still held.
    Armed(A),
}

impl<R, A> Unwound<R, A> {
    /// The running handle, if the stop failed.
    pub fn running(self) -> Option<R> {
        match self {
            Self::Running(handle) => Some(handle),
            Self::Armed(_) => None,
        }
    }

    /// The armed handle, if the stop went through.
    pub fn armed(self) -> Option<A> {
        match self {
            Self::Running(_) => None,
            Self::Armed(handle) => Some(handle),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Configuring {}
    impl<C> Sealed for super::Armed<C> {}
    impl<C> Sealed for super::Running<C> {}
}

/// Driver lifecycle state.
pub trait State: sealed::Sealed {
    /// Name used in logs and `Debug` output.
    const NAME: &'static str;
}

impl State for Configuring {
    const NAME: &'static str = "configuring";
}

impl<C> State for Armed<C> {
    const NAME: &'static str = "armed";
}

impl<C> State for Running<C> {
    const NAME: &'static str = "running";
}

/// States in which the engine is not executing, so the CPU may touch the
/// registers the installed work would otherwise drive.
pub trait Idle: State {}

impl Idle for Configuring {}
impl<C> Idle for Armed<C> {}
