//! # Process runner: one child process under supervision.
//!
//! [`ProcessRunner`] owns a single child's lifecycle: spawn, redirect the
//! combined stdout/stderr into an [`OutputWatcher`], detect the configured
//! readiness marker within a deadline, forward received signals, and classify
//! the exit.
//!
//! ## State machine
//! ```text
//! Starting ──marker──► Ready/Running ──signal──► Terminating ──exit──► Exited
//!    │                      │                                            │
//!    ├─timeout──► Failed    └────────────exit (no signal)──► Failed ◄────┘
//!    └─exit─────► Failed
//! ```
//!
//! ## Rules
//! - Exactly one spawn, one output-copy task per pipe, one startup deadline,
//!   and one wait-on-exit run concurrently; the runner blocks only inside a
//!   single `tokio::select!`.
//! - When events race, the tie-break order is
//!   **marker > signal > exit > timeout** (`biased` arm order).
//! - The startup deadline only runs while a non-empty marker is configured;
//!   an empty marker means ready immediately.
//! - `Ok(())` is returned only when the exit followed a forwarded signal; any
//!   other exit is surfaced as [`RunError::UnexpectedExit`] with the raw
//!   status, uninterpreted.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinSet;

use crate::core::config::Config;
use crate::error::RunError;
use crate::events::{Bus, Event, EventKind};
use crate::runners::runner::{ReadySignal, Runner, SignalRx};
use crate::runners::signal::Signal;
use crate::runners::watcher::OutputWatcher;

/// Startup deadline applied when a spec carries a non-empty marker but no
/// explicit timeout and no config default.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Specification for launching one supervised child process.
///
/// A spec can be created:
/// - **Explicitly** with [`ProcessSpec::new`] plus builder methods
/// - **From config** with [`ProcessSpec::with_defaults`] (inherit the default
///   startup deadline)
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use procvisor::{Config, ProcessSpec};
///
/// let spec = ProcessSpec::new("api", "/usr/local/bin/api-server")
///     .with_args(["--port", "8080"])
///     .with_start_marker("started")
///     .with_defaults(&Config::default());
///
/// assert_eq!(spec.start_timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Clone, Debug)]
pub struct ProcessSpec {
    /// Stable runner name used in diagnostics.
    pub name: String,
    /// Executable path.
    pub program: String,
    /// Argument list, opaque to the runtime.
    pub args: Vec<String>,
    /// Substring that must appear in the combined output before the process
    /// is considered ready. Empty = ready immediately.
    pub start_marker: String,
    /// Startup deadline override.
    ///
    /// - `None` → [`DEFAULT_START_TIMEOUT`] (or the config default via
    ///   [`ProcessSpec::with_defaults`])
    /// - `Some(Duration::ZERO)` → no deadline
    ///
    /// Ignored entirely when `start_marker` is empty.
    pub start_timeout: Option<Duration>,
}

impl ProcessSpec {
    /// Creates a spec with no arguments, no marker, and the default deadline.
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            start_marker: String::new(),
            start_timeout: None,
        }
    }

    /// Replaces the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the readiness marker.
    pub fn with_start_marker(mut self, marker: impl Into<String>) -> Self {
        self.start_marker = marker.into();
        self
    }

    /// Sets an explicit startup deadline (`Duration::ZERO` = none).
    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = Some(timeout);
        self
    }

    /// Fills unset fields from global config.
    ///
    /// Currently inherits `start_timeout`; a zero value in config carries the
    /// usual "no deadline" meaning.
    pub fn with_defaults(mut self, cfg: &Config) -> Self {
        if self.start_timeout.is_none() {
            self.start_timeout = Some(cfg.start_timeout);
        }
        self
    }

    /// The deadline actually applied during startup.
    ///
    /// `None` when the marker is empty (ready immediately) or the timeout was
    /// explicitly zeroed.
    pub(crate) fn effective_start_timeout(&self) -> Option<Duration> {
        if self.start_marker.is_empty() {
            return None;
        }
        match self.start_timeout {
            None => Some(DEFAULT_START_TIMEOUT),
            Some(d) if d == Duration::ZERO => None,
            Some(d) => Some(d),
        }
    }
}

/// Supervises one child process according to its [`ProcessSpec`].
pub struct ProcessRunner {
    spec: ProcessSpec,
    bus: Bus,
}

impl ProcessRunner {
    /// Creates a runner publishing lifecycle events to `bus`.
    pub fn new(spec: ProcessSpec, bus: Bus) -> Self {
        Self { spec, bus }
    }

    /// Returns the launch specification.
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_runner(self.spec.name.as_str()));
    }

    /// Delivers `sig` to the child, verbatim.
    #[cfg(unix)]
    fn deliver(&self, pid: Option<u32>, _child: &mut Child, sig: Signal) {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        if let Some(pid) = pid {
            let _ = kill(Pid::from_raw(pid as i32), nix::sys::signal::Signal::from(sig));
        }
    }

    /// Non-Unix platforms have no per-signal delivery; any forwarded signal
    /// terminates the child.
    #[cfg(not(unix))]
    fn deliver(&self, _pid: Option<u32>, child: &mut Child, _sig: Signal) {
        let _ = child.start_kill();
    }
}

/// Copies one pipe into the shared watcher until EOF.
async fn copy_into<R>(mut reader: R, watcher: OutputWatcher)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => watcher.append(&buf[..n]),
        }
    }
}

/// Awaits the copy tasks so diagnostics see every byte the child wrote.
async fn drain_copies(copies: &mut JoinSet<()>) {
    while copies.join_next().await.is_some() {}
}

#[async_trait]
impl Runner for ProcessRunner {
    fn name(&self) -> &str {
        &self.spec.name
    }

    async fn run(&self, mut signals: SignalRx, mut ready: ReadySignal) -> Result<(), RunError> {
        let mut child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RunError::SpawnFailure {
                program: self.spec.program.clone(),
                source: e,
            })?;
        let pid = child.id();

        let watcher = OutputWatcher::new();
        let mut copies = JoinSet::new();
        if let Some(out) = child.stdout.take() {
            copies.spawn(copy_into(out, watcher.clone()));
        }
        if let Some(err) = child.stderr.take() {
            copies.spawn(copy_into(err, watcher.clone()));
        }

        self.publish(Event::now(EventKind::RunnerStarting));

        let mut detected = watcher.detect(self.spec.start_marker.as_bytes());
        let deadline = self.spec.effective_start_timeout();
        let expired = async {
            match deadline {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expired);

        let mut signaled = false;
        let mut signals_open = true;
        let mut detect_open = true;

        // Starting: the single wait-point reacts to whichever comes first,
        // tie-broken marker > signal > exit > timeout.
        let early_exit = loop {
            tokio::select! {
                biased;
                res = &mut detected, if detect_open => {
                    if res.is_ok() {
                        watcher.cancel_detects();
                        ready.notify();
                        self.publish(Event::now(EventKind::RunnerReady));
                        break None;
                    }
                    // Detection channel closed without firing; the child's
                    // exit or the deadline settles this invocation.
                    detect_open = false;
                }
                sig = signals.recv(), if signals_open => {
                    match sig {
                        Some(sig) => {
                            signaled = true;
                            self.publish(Event::now(EventKind::SignalForwarded).with_signal(sig));
                            self.deliver(pid, &mut child, sig);
                        }
                        None => signals_open = false,
                    }
                }
                status = child.wait() => {
                    break Some(status);
                }
                _ = &mut expired => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    drain_copies(&mut copies).await;
                    let timeout = deadline.unwrap_or(DEFAULT_START_TIMEOUT);
                    self.publish(
                        Event::now(EventKind::StartupTimedOut).with_timeout(timeout),
                    );
                    let err = RunError::StartupTimeout {
                        marker: self.spec.start_marker.clone(),
                        timeout,
                        output: watcher.contents_lossy(),
                    };
                    self.publish(
                        Event::now(EventKind::RunnerFailed).with_reason(err.as_message()),
                    );
                    return Err(err);
                }
            }
        };

        // Either the child already exited during startup, or it is running
        // and we wait for a signal or its exit.
        let status = match early_exit {
            Some(status) => status,
            None => loop {
                tokio::select! {
                    biased;
                    sig = signals.recv(), if signals_open => {
                        match sig {
                            Some(sig) => {
                                signaled = true;
                                self.publish(
                                    Event::now(EventKind::SignalForwarded).with_signal(sig),
                                );
                                self.deliver(pid, &mut child, sig);
                            }
                            None => signals_open = false,
                        }
                    }
                    status = child.wait() => break status,
                }
            },
        };

        drain_copies(&mut copies).await;

        let status = status.map_err(|e| RunError::Fatal {
            error: format!("wait on child failed: {e}"),
        })?;

        // The child can exit in the same instant a write completes its marker;
        // the pipes are drained above, so detection gets the final word
        // (tie-break: marker > exit).
        if !ready.is_notified() && detected.try_recv().is_ok() {
            watcher.cancel_detects();
            ready.notify();
            self.publish(Event::now(EventKind::RunnerReady));
        }

        if signaled {
            self.publish(
                Event::now(EventKind::RunnerExited).with_status(status.to_string()),
            );
            Ok(())
        } else {
            let err = RunError::UnexpectedExit {
                status,
                output: watcher.contents_lossy(),
            };
            self.publish(Event::now(EventKind::RunnerFailed).with_reason(err.as_message()));
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runners::runner::signal_channel;
    use std::time::Instant;

    fn sh(name: &str, script: &str) -> ProcessSpec {
        ProcessSpec::new(name, "sh").with_args(["-c", script])
    }

    fn runner(spec: ProcessSpec) -> ProcessRunner {
        ProcessRunner::new(spec, Bus::new(64))
    }

    #[tokio::test]
    async fn test_empty_marker_is_ready_immediately() {
        let r = runner(sh("debug", "exec sleep 5"));
        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();

        let handle = tokio::spawn(async move { r.run(rx, ready).await });
        tokio::time::timeout(Duration::from_secs(1), ready_rx)
            .await
            .expect("ready within bound")
            .expect("ready fired");

        tx.send(Signal::Terminate).unwrap();
        let res = handle.await.unwrap();
        assert!(res.is_ok(), "signaled exit is graceful: {res:?}");
    }

    #[tokio::test]
    async fn test_marker_detection_then_signaled_exit() {
        let r = runner(sh("api", "echo started; exec sleep 5").with_start_marker("started"));
        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();

        let handle = tokio::spawn(async move { r.run(rx, ready).await });
        tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("marker within bound")
            .expect("ready fired");

        tx.send(Signal::Terminate).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_startup_timeout_kills_child_and_embeds_output() {
        let r = runner(
            sh("api", "echo warming up; exec sleep 5")
                .with_start_marker("ready")
                .with_start_timeout(Duration::from_millis(200)),
        );
        let (_tx, rx) = signal_channel();
        let (ready, _ready_rx) = ReadySignal::channel();

        let begun = Instant::now();
        let err = r.run(rx, ready).await.unwrap_err();
        assert!(begun.elapsed() >= Duration::from_millis(200));
        assert!(begun.elapsed() < Duration::from_secs(4), "child was killed");
        match err {
            RunError::StartupTimeout {
                marker,
                timeout,
                output,
            } => {
                assert_eq!(marker, "ready");
                assert_eq!(timeout, Duration::from_millis(200));
                assert!(output.contains("warming up"));
            }
            other => panic!("expected StartupTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exit_before_ready_is_unexpected() {
        let r = runner(sh("api", "echo nope").with_start_marker("ready"));
        let (_tx, rx) = signal_channel();
        let (ready, _ready_rx) = ReadySignal::channel();

        let err = r.run(rx, ready).await.unwrap_err();
        match err {
            RunError::UnexpectedExit { status, output } => {
                assert!(status.success(), "child itself exited 0");
                assert!(output.contains("nope"));
            }
            other => panic!("expected UnexpectedExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_marker_printed_at_exit_still_fires_ready() {
        // The child prints its marker and exits in the same instant; the
        // marker wins the race with the exit, so readiness fires even though
        // the unsignaled exit is still surfaced as an error.
        let r = runner(sh("oneshot", "echo started").with_start_marker("started"));
        let (_tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();

        let res = r.run(rx, ready).await;
        assert!(ready_rx.await.is_ok(), "readiness fired despite the exit");
        match res.unwrap_err() {
            RunError::UnexpectedExit { output, .. } => {
                assert!(output.contains("started"));
            }
            other => panic!("expected UnexpectedExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unsignaled_clean_exit_is_still_surfaced() {
        // No interpretation of exit codes: a clean self-exit without a
        // forwarded signal is the caller's judgment call.
        let r = runner(sh("oneshot", "true"));
        let (_tx, rx) = signal_channel();
        let (ready, _ready_rx) = ReadySignal::channel();

        let err = r.run(rx, ready).await.unwrap_err();
        assert_eq!(err.as_label(), "unexpected_exit");
    }

    #[tokio::test]
    async fn test_missing_executable_fails_immediately() {
        let r = runner(
            ProcessSpec::new("ghost", "/definitely/not/a/real/binary")
                .with_start_marker("ready"),
        );
        let (_tx, rx) = signal_channel();
        let (ready, _ready_rx) = ReadySignal::channel();

        let begun = Instant::now();
        let err = r.run(rx, ready).await.unwrap_err();
        assert_eq!(err.as_label(), "spawn_failure");
        assert!(begun.elapsed() < Duration::from_secs(1), "no timeout wait");
    }

    #[tokio::test]
    async fn test_stderr_counts_toward_marker() {
        let r = runner(sh("api", "echo started 1>&2; exec sleep 5").with_start_marker("started"));
        let (tx, rx) = signal_channel();
        let (ready, ready_rx) = ReadySignal::channel();

        let handle = tokio::spawn(async move { r.run(rx, ready).await });
        tokio::time::timeout(Duration::from_secs(2), ready_rx)
            .await
            .expect("marker on stderr within bound")
            .expect("ready fired");
        tx.send(Signal::Kill).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }

    #[test]
    fn test_effective_timeout_rules() {
        let cfg = Config::default();
        let with_marker = ProcessSpec::new("a", "sh").with_start_marker("go");
        assert_eq!(
            with_marker.clone().effective_start_timeout(),
            Some(DEFAULT_START_TIMEOUT)
        );
        assert_eq!(
            with_marker
                .clone()
                .with_start_timeout(Duration::ZERO)
                .effective_start_timeout(),
            None
        );
        assert_eq!(
            with_marker.with_defaults(&cfg).effective_start_timeout(),
            Some(cfg.start_timeout)
        );
        // Empty marker: ready immediately, deadline never runs.
        let no_marker = ProcessSpec::new("b", "sh").with_start_timeout(Duration::from_secs(1));
        assert_eq!(no_marker.effective_start_timeout(), None);
    }
}
