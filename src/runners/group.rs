//! # Runner group: an ordered set of named runners as one unit.
//!
//! [`RunnerGroup`] composes members into a single [`Runner`], so groups nest.
//! The policy is *start together, fail fast but drain fully, signal together*:
//!
//! ```text
//! run(signals, ready)
//!   ├─► start every member concurrently (private signal + readiness channels)
//!   ├─► barrier: group ready only after ALL members are ready
//!   │      └─ any member completing first ─► signal the rest, drain, fail
//!   ├─► after ready: fan out every received signal to ALL members at once
//!   └─► return only after EVERY member has exited (first failure reported)
//! ```
//!
//! ## Rules
//! - Member order is startup/shutdown priority for diagnostics only; members
//!   start concurrently.
//! - Signal fan-out uses the members' unbounded channels, so a slow member
//!   never delays signaling the others.
//! - The group never reports success while a member is still outstanding and
//!   never abandons a child on shutdown.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::task::JoinSet;

use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::runners::runner::{signal_channel, ReadySignal, Runner, RunnerRef, SignalRx, SignalTx};
use crate::runners::signal::Signal;

/// A named member of a [`RunnerGroup`].
#[derive(Clone)]
pub struct Member {
    /// Name used in diagnostics and group-level errors.
    pub name: String,
    /// The member runner (a process, or a nested group).
    pub runner: RunnerRef,
}

impl Member {
    /// Creates a named member.
    pub fn new(name: impl Into<String>, runner: RunnerRef) -> Self {
        Self {
            name: name.into(),
            runner,
        }
    }
}

/// Composite runner aggregating several runners into one start/signal/exit unit.
pub struct RunnerGroup {
    name: String,
    members: Vec<Member>,
    bus: Bus,
}

impl RunnerGroup {
    /// Creates a group publishing lifecycle events to `bus`.
    pub fn new(name: impl Into<String>, members: Vec<Member>, bus: Bus) -> Self {
        Self {
            name: name.into(),
            members,
            bus,
        }
    }

    /// The ordered member list.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_runner(self.name.as_str()));
    }

    /// Broadcasts `sig` to every member that has not exited yet.
    ///
    /// Unbounded sends: no member's pace delays another's delivery.
    fn fan_out(&self, txs: &[Option<SignalTx>], sig: Signal) {
        self.publish(Event::now(EventKind::SignalForwarded).with_signal(sig));
        for tx in txs.iter().flatten() {
            let _ = tx.send(sig);
        }
    }
}

#[async_trait]
impl Runner for RunnerGroup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, mut signals: SignalRx, mut ready: ReadySignal) -> Result<(), RunError> {
        let total = self.members.len();
        let mut set: JoinSet<(usize, Result<(), RunError>)> = JoinSet::new();
        let mut txs: Vec<Option<SignalTx>> = Vec::with_capacity(total);
        let mut ready_waits = FuturesUnordered::new();

        for (idx, member) in self.members.iter().enumerate() {
            let (tx, rx) = signal_channel();
            let (member_ready, ready_rx) = ReadySignal::channel();
            txs.push(Some(tx));
            let runner = member.runner.clone();
            set.spawn(async move { (idx, runner.run(rx, member_ready).await) });
            ready_waits.push(async move { (idx, ready_rx.await) });
        }

        self.publish(Event::now(EventKind::RunnerStarting));

        let mut ready_count = 0usize;
        let mut signals_open = true;
        let mut signaled = false;
        let mut first_err: Option<RunError> = None;

        // Startup barrier: all members ready, or abort on the first completion.
        while ready_count < total && first_err.is_none() && !set.is_empty() {
            tokio::select! {
                biased;
                Some((_, res)) = ready_waits.next(), if !ready_waits.is_empty() => {
                    if res.is_ok() {
                        ready_count += 1;
                    }
                    // Err: the member dropped its handle un-notified; its
                    // terminal result arrives through the join set below.
                }
                sig = signals.recv(), if signals_open => {
                    match sig {
                        Some(sig) => {
                            signaled = true;
                            self.fan_out(&txs, sig);
                        }
                        None => signals_open = false,
                    }
                }
                joined = set.join_next() => {
                    let Some(joined) = joined else { continue };
                    match joined {
                        Ok((idx, res)) => {
                            txs[idx] = None;
                            let name = &self.members[idx].name;
                            first_err = match res {
                                Err(e) => Some(RunError::MemberFailure {
                                    member: name.clone(),
                                    source: Box::new(e),
                                }),
                                // A clean exit is only acceptable here if we
                                // asked for it; otherwise the barrier would
                                // wait forever.
                                Ok(()) if !signaled => Some(RunError::ExitedBeforeReady {
                                    name: name.clone(),
                                }),
                                Ok(()) => None,
                            };
                        }
                        Err(e) => {
                            first_err = Some(RunError::Fatal {
                                error: format!("member task panicked: {e}"),
                            });
                        }
                    }
                }
            }
        }

        if first_err.is_none() && ready_count == total {
            ready.notify();
            self.publish(Event::now(EventKind::RunnerReady));
        } else if first_err.is_some() && !set.is_empty() {
            // Abort startup: stop the already-started members before draining.
            self.fan_out(&txs, Signal::Terminate);
        }

        // Drain fully: every member must exit before the group returns,
        // regardless of how many failed. Signals keep flowing meanwhile.
        while !set.is_empty() {
            tokio::select! {
                biased;
                sig = signals.recv(), if signals_open => {
                    match sig {
                        Some(sig) => self.fan_out(&txs, sig),
                        None => signals_open = false,
                    }
                }
                joined = set.join_next() => {
                    let Some(joined) = joined else { continue };
                    match joined {
                        Ok((idx, res)) => {
                            txs[idx] = None;
                            if let Err(e) = res {
                                let wrapped = RunError::MemberFailure {
                                    member: self.members[idx].name.clone(),
                                    source: Box::new(e),
                                };
                                if first_err.is_none() {
                                    first_err = Some(wrapped);
                                }
                            }
                        }
                        Err(e) => {
                            if first_err.is_none() {
                                first_err = Some(RunError::Fatal {
                                    error: format!("member task panicked: {e}"),
                                });
                            }
                        }
                    }
                }
            }
        }

        match first_err {
            None => {
                self.publish(Event::now(EventKind::RunnerExited));
                Ok(())
            }
            Some(err) => {
                self.publish(Event::now(EventKind::RunnerFailed).with_reason(err.as_message()));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::process::{ProcessRunner, ProcessSpec};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn sh_runner(name: &str, script: &str, marker: &str, bus: &Bus) -> RunnerRef {
        let spec = ProcessSpec::new(name, "sh")
            .with_args(["-c", script])
            .with_start_marker(marker);
        Arc::new(ProcessRunner::new(spec, bus.clone()))
    }

    #[tokio::test]
    async fn test_group_ready_when_all_members_ready() {
        let bus = Bus::new(64);
        let group = RunnerGroup::new(
            "unit",
            vec![
                Member::new("debug", sh_runner("debug", "exec sleep 5", "", &bus)),
                Member::new(
                    "api",
                    sh_runner("api", "sleep 0.3; echo started; exec sleep 5", "started", &bus),
                ),
            ],
            bus.clone(),
        );

        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();
        let begun = Instant::now();
        let handle = tokio::spawn(async move { group.run(rx, ready).await });

        tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("group ready within bound")
            .expect("group ready fired");
        // Not before the slower member's marker.
        assert!(begun.elapsed() >= Duration::from_millis(300));

        tx.send(Signal::Terminate).unwrap();
        assert!(handle.await.unwrap().is_ok(), "both exits were signaled");
    }

    #[tokio::test]
    async fn test_member_failure_during_startup_drains_and_never_fires_ready() {
        let bus = Bus::new(64);
        let group = RunnerGroup::new(
            "unit",
            vec![
                Member::new("stable", sh_runner("stable", "exec sleep 5", "", &bus)),
                Member::new(
                    "broken",
                    sh_runner("broken", "echo oops; exit 3", "never-appears", &bus),
                ),
            ],
            bus.clone(),
        );

        let (_tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();
        let err = group.run(rx, ready).await.unwrap_err();

        match &err {
            RunError::MemberFailure { member, source } => {
                assert_eq!(member, "broken");
                assert_eq!(source.as_label(), "unexpected_exit");
            }
            other => panic!("expected MemberFailure, got {other:?}"),
        }
        // Group readiness never fired; the handle was dropped un-notified.
        assert!(ready_rx.await.is_err());
    }

    #[tokio::test]
    async fn test_signal_fans_out_to_every_member() {
        let bus = Bus::new(64);
        let group = RunnerGroup::new(
            "unit",
            vec![
                Member::new("a", sh_runner("a", "exec sleep 5", "", &bus)),
                Member::new("b", sh_runner("b", "exec sleep 5", "", &bus)),
                Member::new("c", sh_runner("c", "exec sleep 5", "", &bus)),
            ],
            bus.clone(),
        );

        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();
        let handle = tokio::spawn(async move { group.run(rx, ready).await });
        ready_rx.await.expect("group ready");

        tx.send(Signal::Terminate).unwrap();
        // The group returns only after every member exits, and all exits
        // followed the forwarded signal.
        let res = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("group drained within bound")
            .unwrap();
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn test_groups_nest() {
        let bus = Bus::new(64);
        let inner = RunnerGroup::new(
            "inner",
            vec![Member::new("worker", sh_runner("worker", "exec sleep 5", "", &bus))],
            bus.clone(),
        );
        let outer = RunnerGroup::new(
            "outer",
            vec![
                Member::new("inner", Arc::new(inner) as RunnerRef),
                Member::new("api", sh_runner("api", "echo started; exec sleep 5", "started", &bus)),
            ],
            bus.clone(),
        );

        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();
        let handle = tokio::spawn(async move { outer.run(rx, ready).await });
        tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("nested group ready within bound")
            .expect("ready fired");

        tx.send(Signal::Terminate).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_empty_group_is_ready_and_exits_clean() {
        let bus = Bus::new(16);
        let group = RunnerGroup::new("empty", Vec::new(), bus.clone());
        let (_tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();
        assert!(group.run(rx, ready).await.is_ok());
        assert!(ready_rx.await.is_ok());
    }
}
