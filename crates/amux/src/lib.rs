//! Connection sequencer for a shared analog multiplexer bank.
//!
//! Several analog pins share one converter through a global analog bus. Each
//! pin is routed onto the bus by writing its field in a port select register.
//! [`Amux`] keeps an ordered set of such connections and steps through it,
//! either from the CPU ([`Amux::connect`], [`Amux::connect_next`]) or
//! autonomously: once armed, a transfer engine channel walks a descriptor
//! ring that releases the previous pin and routes the next one on every
//! trigger.
//!
//! ```text
//!           trigger            trigger            trigger
//!              │                  │                  │
//!  ring: [clear K-1|set 0] → [clear 0|set 1] → ... → [clear K-2|set K-1] ─┐
//!          ▲                                                              │
//!          └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use amux::{Amux, Bank, Port};
//!
//! let mut amux: Amux<_> = Amux::new(bus, Bank::B);
//! amux.add_port(Port::new(9), 0xFF)?;
//! amux.add_port(Port::new(10), 0xFF)?;
//! let running = amux.arm(dma_channel).map_err(|r| r.error)?.start().map_err(|r| r.error)?;
//! ```
//!
//! # Features
//!
//! - `defmt`: logs and `defmt::Format` derives for target builds
//! - `tracing`: logs through `tracing` on the host

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![deny(unsafe_code)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod error;
mod ring;
pub mod routing;
pub mod sequencer;

pub use error::AmuxError;
pub use routing::{Bank, Connection, PinSelect, Port, RoutingLayout, SubRegister};
pub use platform::{Armed, Configuring, Idle, Running, State, Unwound};
pub use sequencer::{Amux, Cursor};
