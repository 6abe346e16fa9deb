//! Hardware capabilities for autonomous multi-channel acquisition.
//!
//! This crate holds the traits the acquisition drivers are written against,
//! together with the descriptor model they program into a transfer engine.
//! It contains no driver logic of its own.
//!
//! # Architecture Layers
//!
//! ```text
//! Application
//!         ↓
//! Drivers (amux: connection sequencer, sampler: acquisition scheduler)
//!         ↓
//! Platform capabilities (this crate - traits + descriptor model)
//!         ↓
//! Vendor HAL / PAC, or `mocks` on the host
//! ```
//!
//! # Capabilities
//!
//! - [`RegisterBus`] - 32-bit register read/write
//! - [`TransferChannel`] - one channel of an autonomous transfer engine
//! - [`TimerCounter`] - free-running counter with compare match
//! - [`Converter`] - ADC with memory-mapped result registers
//!
//! # Features
//!
//! - `std`: Simulated hardware in [`mocks`]
//! - `defmt`: `defmt::Format` on all public types
//!
//! # Example
//!
//! ```
//! use platform::{Address, Descriptor, DescriptorChain, DescriptorId, TriggerMode};
//!
//! let ring = [
//!     Descriptor::register_write(Address::new(0x4031_0090), 0)
//!         .with_trigger(TriggerMode::Chain)
//!         .with_next(Some(DescriptorId::new(1))),
//!     Descriptor::register_write(Address::new(0x4031_0090), 5)
//!         .with_next(Some(DescriptorId::HEAD)),
//! ];
//! let chain = DescriptorChain::new(&ring, DescriptorId::HEAD).unwrap();
//! assert_eq!(chain.cycle_len(DescriptorId::HEAD), Some(2));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware capability crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod converter;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod mocks;
pub mod register;
pub mod timer;
pub mod transfer;

pub use converter::{Converter, RESULT_STRIDE};
pub use descriptor::{
    ChainError, DataWidth, Descriptor, DescriptorChain, DescriptorId, Endpoint, TriggerMode,
};
pub use error::Rejected;
pub use lifecycle::{Armed, Configuring, Idle, Running, State, Unwound};
pub use register::{Address, MmioBus, RegisterBus};
pub use timer::{CountDirection, CounterConfig, Prescaler, RunMode, TimerCounter, TimerEvent};
pub use transfer::{ChannelConfig, ChannelId, TransferChannel};
