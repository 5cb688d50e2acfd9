//! # procvisor
//!
//! **Procvisor** is a minimal process-supervision library for Rust.
//!
//! It launches, monitors, and tears down one or more cooperating child
//! processes as a single logical unit, reporting readiness only once
//! configured startup markers appear in their combined output streams.
//! It is single-host, single-operator supervision: no restarts, no resource
//! limits, no cross-host orchestration.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ ProcessSpec  │   │ ProcessSpec  │   │ ProcessSpec  │
//!     │  ("debug")   │   │   ("api")    │   │  ("worker")  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ProcessRunner │   │ProcessRunner │   │ProcessRunner │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            └─────────┬────────┴─────────┬────────┘
//!                      ▼                  ▼
//!           ┌───────────────────────────────────────┐
//!           │  RunnerGroup ("unit")                 │
//!           │  - all ready  ──► group ready         │
//!           │  - any signal ──► fan-out to all      │
//!           │  - returns after every member exits   │
//!           └──────────────────┬────────────────────┘
//!                              ▼
//!           ┌───────────────────────────────────────┐
//!           │  Supervisor                           │
//!           │  - relays OS signals (SIGINT/SIGTERM) │
//!           │  - blocks on ready, then on exit      │
//!           │  - Bus ──► SubscriberSet (logging…)   │
//!           └───────────────────────────────────────┘
//! ```
//!
//! ### Process lifecycle
//! ```text
//! ProcessRunner::run(signals, ready)
//!   ├─► spawn child (stdout/stderr ─► OutputWatcher)
//!   ├─► Starting: select! { biased;       // marker > signal > exit > timeout
//!   │       marker detected ─► ready.notify(), cancel further scanning
//!   │       signal received ─► forward verbatim to child
//!   │       child exited    ─► classify below
//!   │       deadline hit    ─► kill child, StartupTimeout{marker, deadline, output}
//!   │   }
//!   └─► Running: select! { signal ─► forward; exit ─► classify }
//!
//! Exit classification:
//!   exit after a forwarded signal ─► Ok(())           (graceful)
//!   any other exit                ─► UnexpectedExit    (raw status, no 0-vs-1 judgment)
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types / traits               |
//! |-----------------|--------------------------------------------------------------|----------------------------------|
//! | **Runners**     | Supervise processes or whole groups behind one contract.     | [`Runner`], [`ProcessRunner`], [`RunnerGroup`] |
//! | **Readiness**   | Substring markers over combined output, with deadlines.      | [`OutputWatcher`], [`ProcessSpec`] |
//! | **Signals**     | Opaque OS signal values, forwarded verbatim, fanned out.     | [`Signal`], [`signal_channel`]   |
//! | **Supervision** | Invoke, block on ready, block on exit; failures surface.     | [`Supervisor`], [`Config`]       |
//! | **Errors**      | Self-explanatory failures embedding captured output.         | [`RunError`]                     |
//! | **Events**      | Lifecycle events fanned out to subscribers.                  | [`Event`], [`Subscribe`]         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use procvisor::{
//!     Config, Member, ProcessRunner, ProcessSpec, RunnerGroup, RunnerRef, Subscribe,
//!     Supervisor,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let cfg = Config::default();
//!
//!     // Build subscribers (optional)
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(procvisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::new(cfg.clone(), subs);
//!     let bus = sup.bus();
//!
//!     // "api" is ready once it prints its marker; "debug" immediately.
//!     let api = ProcessSpec::new("api", "/usr/local/bin/api-server")
//!         .with_start_marker("started")
//!         .with_defaults(&cfg);
//!     let debug = ProcessSpec::new("debug", "/usr/local/bin/debug-server");
//!
//!     let unit = RunnerGroup::new(
//!         "unit",
//!         vec![
//!             Member::new("debug", Arc::new(ProcessRunner::new(debug, bus.clone())) as _),
//!             Member::new("api", Arc::new(ProcessRunner::new(api, bus.clone())) as _),
//!         ],
//!         bus,
//!     );
//!
//!     // Blocks until ready, then until termination. A terminal error is
//!     // fatal for the whole program; supervision is not retried.
//!     if let Err(e) = sup.run(Arc::new(unit) as RunnerRef).await {
//!         eprintln!("supervision failed: {e}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod core;
mod error;
mod events;
mod runners;
mod subscribers;

// ---- Public re-exports ----

pub use core::{wait_for_os_signal, Config, Supervisor};
pub use error::RunError;
pub use events::{Bus, Event, EventKind};
pub use runners::{
    signal_channel, Member, OutputWatcher, ProcessRunner, ProcessSpec, ReadyRx, ReadySignal,
    Runner, RunnerGroup, RunnerRef, Signal, SignalRx, SignalTx, DEFAULT_START_TIMEOUT,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
