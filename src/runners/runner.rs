//! # Runner abstraction: a supervised unit with start/ready/exit semantics.
//!
//! This module defines the [`Runner`] trait and the two channel halves every
//! runner is invoked with:
//!
//! - a private **signal channel** ([`SignalRx`]) on which cancellation requests
//!   arrive as opaque [`Signal`] values the runner must forward to its children;
//! - a one-shot **readiness handle** ([`ReadySignal`]) the runner notifies once
//!   its startup markers have been observed.
//!
//! The common handle type is [`RunnerRef`], an `Arc<dyn Runner>` suitable for
//! sharing across the runtime. [`RunnerGroup`](crate::RunnerGroup) implements
//! `Runner` itself, so groups nest.
//!
//! ## Contract
//! - `run` returns `Ok(())` only when the unit exited as a consequence of a
//!   forwarded signal (graceful shutdown); any other termination is an error.
//! - The readiness handle fires **at most once** and never after `run` has
//!   returned an error (a failing runner simply drops it un-notified).

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::RunError;
use crate::runners::signal::Signal;

/// # Shared handle to a runner object.
///
/// This is the primary type used by the supervisor and groups.
pub type RunnerRef = Arc<dyn Runner>;

/// Sending half of a runner's private signal channel.
pub type SignalTx = mpsc::UnboundedSender<Signal>;

/// Receiving half of a runner's private signal channel.
pub type SignalRx = mpsc::UnboundedReceiver<Signal>;

/// Receiving half of a readiness notification.
///
/// Resolves `Ok(())` when the runner became ready; resolves `Err` if the
/// runner terminated without ever becoming ready.
pub type ReadyRx = oneshot::Receiver<()>;

/// Creates a private signal channel for one runner invocation.
///
/// The channel is unbounded so fan-out to many members never blocks on a slow
/// one; signals are rare and tiny.
pub fn signal_channel() -> (SignalTx, SignalRx) {
    mpsc::unbounded_channel()
}

/// # One-shot readiness handle passed into [`Runner::run`].
///
/// The sender is consumed on the first [`notify`](ReadySignal::notify), so
/// readiness is structurally at-most-once. Dropping the handle without
/// notifying tells the listener the runner will never be ready.
#[derive(Debug)]
pub struct ReadySignal {
    tx: Option<oneshot::Sender<()>>,
}

impl ReadySignal {
    /// Creates a connected (handle, receiver) pair.
    pub fn channel() -> (Self, ReadyRx) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Announces readiness to the listener. Idempotent; only the first call
    /// has any effect.
    pub fn notify(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }

    /// True once [`notify`](ReadySignal::notify) has been called.
    pub fn is_notified(&self) -> bool {
        self.tx.is_none()
    }
}

/// # Asynchronous, signal-aware unit of supervision.
///
/// A `Runner` has a stable [`name`](Runner::name) used in diagnostics and an
/// async [`run`](Runner::run) method that drives the unit from spawn to exit.
/// Implementors must forward every received [`Signal`] to any live children
/// before reporting exited.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use procvisor::{ReadySignal, RunError, Runner, SignalRx};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Runner for Noop {
///     fn name(&self) -> &str { "noop" }
///
///     async fn run(
///         &self,
///         mut signals: SignalRx,
///         mut ready: ReadySignal,
///     ) -> Result<(), RunError> {
///         ready.notify();
///         // exit once the caller asks us to stop
///         let _ = signals.recv().await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Returns a stable, human-readable runner name.
    fn name(&self) -> &str;

    /// Drives the unit until it exits.
    ///
    /// `signals` is this invocation's private cancellation channel; `ready`
    /// must be notified exactly when the unit's startup criteria are met.
    async fn run(&self, signals: SignalRx, ready: ReadySignal) -> Result<(), RunError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_signal_fires_once() {
        let (mut ready, rx) = ReadySignal::channel();
        assert!(!ready.is_notified());
        ready.notify();
        assert!(ready.is_notified());
        ready.notify(); // no-op
        assert!(rx.await.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_ready_signal_resolves_err() {
        let (ready, rx) = ReadySignal::channel();
        drop(ready);
        assert!(rx.await.is_err());
    }
}
