//! # Supervisor: invokes the top-level runner and blocks until it terminates.
//!
//! The [`Supervisor`] owns the event bus and a [`SubscriberSet`]. Its
//! [`run`](Supervisor::run) method wires OS termination signals to the
//! top-level [`Runner`]'s private signal channel, announces the
//! starting → started transition via events, and returns the runner's
//! terminal result.
//!
//! ## High-level architecture
//! ```text
//! Inputs to run():
//!   RunnerRef (single ProcessRunner, or a RunnerGroup of them)
//!
//! Wiring:
//!   - subscriber_listener(): Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - relay_os_signals(): wait_for_os_signal() ─► runner's signal channel
//!                          └─► Bus.publish(ShutdownRequested)
//!
//! Invocation:
//!   publish SupervisorStarting
//!   spawn runner.run(signals, ready)
//!   await readiness            ─► publish SupervisorStarted
//!   await termination          ─► Ok(()) | Err(RunError)
//! ```
//!
//! ## Rules
//! - A terminal error is **returned**, never retried; translating it into a
//!   non-zero process exit is the binary's job.
//! - Readiness that never fires is not an error by itself; the runner's
//!   terminal result carries the failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinError;

use crate::core::config::Config;
use crate::core::shutdown;
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::runners::{signal_channel, ReadySignal, RunnerRef, SignalRx, SignalTx};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Invokes a top-level runner, relaying OS signals and publishing lifecycle
/// events to subscribers.
pub struct Supervisor {
    /// Global runtime configuration.
    pub cfg: Config,
    /// Event bus shared with all runners.
    pub bus: Bus,
    /// Fan-out set for subscribers.
    pub subs: Arc<SubscriberSet>,
    /// Set once the bus-to-subscribers listener task has been spawned.
    listener_started: AtomicBool,
}

impl Supervisor {
    /// Creates a new supervisor with the given config and subscribers.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            bus,
            subs: Arc::new(SubscriberSet::new(subscribers)),
            listener_started: AtomicBool::new(false),
        }
    }

    /// Returns a clone of the event bus for constructing runners.
    pub fn bus(&self) -> Bus {
        self.bus.clone()
    }

    /// Invokes `runner` wired to OS termination signals and blocks until it
    /// terminates.
    ///
    /// Blocks first on readiness (publishing [`EventKind::SupervisorStarted`]),
    /// then on the terminal result. Failures are returned as-is; the
    /// supervisor owns no retry logic.
    pub async fn run(&self, runner: RunnerRef) -> Result<(), RunError> {
        let (sig_tx, sig_rx) = signal_channel();
        self.relay_os_signals(sig_tx);
        self.invoke(runner, sig_rx).await
    }

    /// Invokes `runner` with a caller-owned signal channel.
    ///
    /// Lets embedders (and tests) deliver signals programmatically instead of
    /// from the OS.
    pub async fn invoke(&self, runner: RunnerRef, signals: SignalRx) -> Result<(), RunError> {
        // Spawned once; a supervisor reused for a second invocation must not
        // deliver each event to subscribers twice.
        if !self.listener_started.swap(true, Ordering::SeqCst) {
            self.subscriber_listener();
        }

        let name: Arc<str> = runner.name().into();
        let (ready, mut ready_rx) = ReadySignal::channel();
        self.bus
            .publish(Event::now(EventKind::SupervisorStarting).with_runner(name.clone()));

        let mut handle = tokio::spawn({
            let runner = runner.clone();
            async move { runner.run(signals, ready).await }
        });

        tokio::select! {
            biased;
            res = &mut ready_rx => {
                if res.is_ok() {
                    self.bus
                        .publish(Event::now(EventKind::SupervisorStarted).with_runner(name));
                }
                // Dropped un-notified: the terminal result below explains why.
            }
            out = &mut handle => {
                return unwind(out);
            }
        }

        unwind(handle.await)
    }

    /// Subscribes to the bus and forwards events to the subscriber set
    /// (fire-and-forget). Spawned at most once per supervisor.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                set.emit(&ev);
            }
        });
    }

    /// Relays OS termination signals to the runner's channel until the runner
    /// stops listening.
    fn relay_os_signals(&self, tx: SignalTx) {
        let bus = self.bus.clone();
        tokio::spawn(async move {
            loop {
                match shutdown::wait_for_os_signal().await {
                    Ok(sig) => {
                        bus.publish(Event::now(EventKind::ShutdownRequested).with_signal(sig));
                        if tx.send(sig).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });
    }
}

fn unwind(out: Result<Result<(), RunError>, JoinError>) -> Result<(), RunError> {
    match out {
        Ok(res) => res,
        Err(e) => Err(RunError::Fatal {
            error: format!("runner task panicked: {e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::{Member, ProcessRunner, ProcessSpec, RunnerGroup, Signal};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn supervisor() -> Supervisor {
        Supervisor::new(Config::default(), Vec::new())
    }

    struct Counting {
        startings: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Subscribe for Counting {
        async fn on_event(&self, event: &Event) {
            if event.kind == EventKind::SupervisorStarting {
                self.startings.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_invoke_blocks_through_ready_then_exit() {
        let sup = supervisor();
        let spec = ProcessSpec::new("api", "sh")
            .with_args(["-c", "echo started; exec sleep 5"])
            .with_start_marker("started");
        let runner: RunnerRef = Arc::new(ProcessRunner::new(spec, sup.bus()));

        let (tx, rx) = signal_channel();
        let mut events = sup.bus.subscribe();

        let sup = Arc::new(sup);
        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.invoke(runner, rx).await })
        };

        // Wait for the started announcement, then terminate.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let ev = tokio::time::timeout_at(deadline, events.recv())
                .await
                .expect("started within bound")
                .expect("bus open");
            if ev.kind == EventKind::SupervisorStarted {
                break;
            }
        }
        tx.send(Signal::Terminate).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_invoke_surfaces_terminal_error_without_started() {
        let sup = supervisor();
        let spec = ProcessSpec::new("ghost", "/definitely/not/a/real/binary");
        let runner: RunnerRef = Arc::new(ProcessRunner::new(spec, sup.bus()));

        let (_tx, rx) = signal_channel();
        let err = sup.invoke(runner, rx).await.unwrap_err();
        assert_eq!(err.as_label(), "spawn_failure");
    }

    #[tokio::test]
    async fn test_reused_supervisor_delivers_events_once() {
        let startings = Arc::new(AtomicUsize::new(0));
        let sup = Supervisor::new(
            Config::default(),
            vec![Arc::new(Counting {
                startings: Arc::clone(&startings),
            })],
        );

        for _ in 0..2 {
            let spec = ProcessSpec::new("oneshot", "true");
            let runner: RunnerRef = Arc::new(ProcessRunner::new(spec, sup.bus()));
            let (_tx, rx) = signal_channel();
            // Unsignaled exit; the error itself is not under test here.
            let _ = sup.invoke(runner, rx).await;
        }

        // Give the listener and worker queues a beat to flush.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(startings.load(Ordering::SeqCst), 2, "one delivery per invoke");
    }

    #[tokio::test]
    async fn test_invoke_group_scenario() {
        // Two runners: "debug" ready immediately, "api" ready on its marker;
        // the unit becomes ready when "api" prints, and a terminate signal
        // brings both down cleanly.
        let sup = supervisor();
        let bus = sup.bus();
        let debug = ProcessSpec::new("debug", "sh").with_args(["-c", "exec sleep 5"]);
        let api = ProcessSpec::new("api", "sh")
            .with_args(["-c", "echo started; exec sleep 5"])
            .with_start_marker("started");
        let group = RunnerGroup::new(
            "unit",
            vec![
                Member::new("debug", Arc::new(ProcessRunner::new(debug, bus.clone())) as _),
                Member::new("api", Arc::new(ProcessRunner::new(api, bus.clone())) as _),
            ],
            bus,
        );

        let (tx, rx) = signal_channel();
        let mut events = sup.bus.subscribe();
        let sup = Arc::new(sup);
        let handle = {
            let sup = Arc::clone(&sup);
            tokio::spawn(async move { sup.invoke(Arc::new(group) as _, rx).await })
        };

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let ev = tokio::time::timeout_at(deadline, events.recv())
                .await
                .expect("group started within bound")
                .expect("bus open");
            if ev.kind == EventKind::SupervisorStarted {
                break;
            }
        }
        tx.send(Signal::Terminate).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
