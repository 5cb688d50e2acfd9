//! Runtime core: invocation and lifecycle.
//!
//! This module contains the embedded implementation of the procvisor runtime.
//! The public API from this module is [`Supervisor`], which invokes the
//! top-level runner, and [`Config`], the global runtime configuration.
//!
//! Internal modules:
//! - [`supervisor`]: wires OS signals to the top-level runner and blocks on
//!   readiness, then on termination;
//! - [`shutdown`]: cross-platform termination signal handling;
//! - [`config`]: global defaults (startup deadline, bus capacity).

pub(crate) mod config;
mod shutdown;
mod supervisor;

pub use config::Config;
pub use shutdown::wait_for_os_signal;
pub use supervisor::Supervisor;
