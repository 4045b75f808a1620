//! # sync-core
//!
//! Pure logic for session-sync (no I/O, instant tests).
//!
//! This crate implements the run state machine and its supporting pieces
//! without any network access, timers or threads.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. The elapsed time and the download engine's activity
//! are passed in by the caller, so every termination rule can be exercised
//! deterministically.
//!
//! The actual I/O (polling, downloads, device queries, timers) is performed by
//! `sync-client`, which interprets the actions produced by [`RunState`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod diff;
pub mod progress;
pub mod run;
pub mod time_range;

pub use diff::ItemDiffCache;
pub use progress::{ProgressCounters, RunLimits};
pub use run::{Action, EvalContext, Event, RunState};
pub use time_range::{resolve_limits, Certificate};
