//! Timer-paced acquisition scheduler.
//!
//! A free-running timer produces one conversion period at the requested
//! rate. Its rollover event triggers a transfer engine channel that streams
//! the converter's results into a caller-supplied buffer through a single
//! self-looping descriptor; its compare event marks the end of the
//! acquisition window and is meant to step a connection sequencer (the
//! `amux` crate) on a second channel, keeping routing and conversion
//! phase-locked without CPU involvement.
//!
//! ```text
//!             period_ticks
//!  ├──────────────────────────────────────┤
//!  0 ── acquisition ── compare ────────── rollover
//!                         │                  │
//!                  step multiplexer    stream results → target
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sampler::{AcquisitionTarget, Sampler};
//!
//! static BUFFER: StaticCell<[i16; 8]> = StaticCell::new();
//!
//! let mut sampler = Sampler::new(converter, timer).map_err(|r| r.error)?;
//! sampler.set_rate(920_000, 180)?;
//! sampler.configure(8, AcquisitionTarget::new(BUFFER.init([0; 8])))?;
//! let running = sampler.setup_autonomous(dma_channel).map_err(|r| r.error)?
//!     .start().map_err(|r| r.error)?;
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
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod error;
pub mod scheduler;
pub mod stream;
pub mod target;
pub mod timing;

pub use error::SamplerError;
pub use platform::{Armed, Configuring, Idle, Running, State, Unwound};
pub use scheduler::{Parts, Sampler};
pub use stream::StreamLayout;
pub use target::AcquisitionTarget;
pub use timing::ScanTiming;
