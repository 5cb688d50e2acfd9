//! # Runner abstractions: processes, groups, and their building blocks.
//!
//! This module provides the supervision units:
//! - [`Runner`] - trait for units with start/ready/exit semantics
//! - [`ProcessRunner`]/[`ProcessSpec`] - one child process under supervision
//! - [`RunnerGroup`]/[`Member`] - an ordered set of runners as one unit
//! - [`OutputWatcher`] - combined-output buffer with marker detection
//! - [`Signal`] - opaque OS signal values forwarded downstream
//! - [`ReadySignal`]/[`signal_channel`] - the channels a runner is invoked with

mod group;
mod process;
mod runner;
mod signal;
mod watcher;

pub use group::{Member, RunnerGroup};
pub use process::{ProcessRunner, ProcessSpec, DEFAULT_START_TIMEOUT};
pub use runner::{
    signal_channel, ReadyRx, ReadySignal, Runner, RunnerRef, SignalRx, SignalTx,
};
pub use signal::Signal;
pub use watcher::OutputWatcher;
