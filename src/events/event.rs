//! # Runtime events emitted by the supervisor, process runners, and groups.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Supervisor events**: invocation flow (starting, started, shutdown requested)
//! - **Runner lifecycle events**: spawn, readiness, signal forwarding, exit
//! - **Failure events**: startup timeout, terminal failure
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! runner name, forwarded signals, and exit statuses.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use procvisor::{Event, EventKind, Signal};
//!
//! let ev = Event::now(EventKind::SignalForwarded)
//!     .with_runner("api")
//!     .with_signal(Signal::Terminate);
//!
//! assert_eq!(ev.kind, EventKind::SignalForwarded);
//! assert_eq!(ev.runner.as_deref(), Some("api"));
//! assert_eq!(ev.signal, Some(Signal::Terminate));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::runners::Signal;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Supervisor events ===
    /// The supervisor is invoking the top-level runner.
    ///
    /// Sets: `runner`, `at`, `seq`.
    SupervisorStarting,

    /// The top-level runner reported ready.
    ///
    /// Sets: `runner`, `at`, `seq`.
    SupervisorStarted,

    /// An OS termination signal was observed and relayed to the top-level
    /// runner.
    ///
    /// Sets: `signal`, `at`, `seq`.
    ShutdownRequested,

    // === Runner lifecycle events ===
    /// A runner is spawning its unit (child process or members).
    ///
    /// Sets: `runner`, `at`, `seq`.
    RunnerStarting,

    /// A runner's readiness criteria were met.
    ///
    /// Sets: `runner`, `at`, `seq`.
    RunnerReady,

    /// A runner forwarded a signal to its unit.
    ///
    /// Sets: `runner`, `signal`, `at`, `seq`.
    SignalForwarded,

    /// A runner's unit exited gracefully (after a forwarded signal, or, for a
    /// group, with all members exited cleanly).
    ///
    /// Sets: `runner`, `status` (processes only), `at`, `seq`.
    RunnerExited,

    // === Failure events ===
    /// A runner's readiness marker did not appear within the deadline.
    ///
    /// Always followed by [`EventKind::RunnerFailed`].
    ///
    /// Sets: `runner`, `timeout_ms`, `at`, `seq`.
    StartupTimedOut,

    /// A runner terminated with an error.
    ///
    /// Sets: `runner`, `reason`, `at`, `seq`.
    RunnerFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the runner, if applicable.
    pub runner: Option<Arc<str>>,
    /// Human-readable reason (failure messages).
    pub reason: Option<Arc<str>>,
    /// Child exit status rendered for logs.
    pub status: Option<Arc<str>>,
    /// Forwarded or observed signal.
    pub signal: Option<Signal>,
    /// Startup deadline in milliseconds (compact).
    pub timeout_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            runner: None,
            reason: None,
            status: None,
            signal: None,
            timeout_ms: None,
        }
    }

    /// Attaches a runner name.
    #[inline]
    pub fn with_runner(mut self, runner: impl Into<Arc<str>>) -> Self {
        self.runner = Some(runner.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a rendered exit status.
    #[inline]
    pub fn with_status(mut self, status: impl Into<Arc<str>>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Attaches a signal.
    #[inline]
    pub fn with_signal(mut self, signal: Signal) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a startup deadline (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::now(EventKind::RunnerStarting);
        let b = Event::now(EventKind::RunnerReady);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::now(EventKind::RunnerFailed)
            .with_runner("api")
            .with_reason("boom")
            .with_status("exit status: 1")
            .with_timeout(Duration::from_millis(1500));
        assert_eq!(ev.runner.as_deref(), Some("api"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        assert_eq!(ev.status.as_deref(), Some("exit status: 1"));
        assert_eq!(ev.timeout_ms, Some(1500));
    }
}
