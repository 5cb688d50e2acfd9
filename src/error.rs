//! Error types used by the procvisor runtime and runners.
//!
//! Everything a runner can fail with is collected in one enum, [`RunError`]:
//!
//! - startup failures (`SpawnFailure`, `StartupTimeout`)
//! - exit classification (`UnexpectedExit`)
//! - group-level wrappers (`MemberFailure`, `ExitedBeforeReady`)
//! - non-recoverable internal conditions (`Fatal`)
//!
//! Failures always propagate to the immediate caller; nothing is retried or
//! suppressed inside the runtime. Startup errors deliberately embed the full
//! captured child output so they are self-explanatory without external log
//! correlation.
//!
//! The type provides helper methods (`as_label`, `as_message`) for logging/metrics
//! and [`RunError::root`] for unwrapping nested group failures.

use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// # Errors produced by supervised runners.
///
/// Group-level failures wrap the member failure that caused them, so a nested
/// group produces a chain that [`RunError::root`] can descend.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunError {
    /// The readiness marker never appeared within the startup deadline.
    ///
    /// Carries the configured marker, the deadline, and the full captured
    /// output so the failure is diagnosable on its own.
    #[error("did not detect {marker:?} within {timeout:?}; output:\n{output}")]
    StartupTimeout {
        /// The marker that was being watched for.
        marker: String,
        /// The startup deadline that elapsed.
        timeout: Duration,
        /// Everything the child wrote before it was killed.
        output: String,
    },

    /// The child exited without a forwarded signal.
    ///
    /// The raw exit status is surfaced without interpretation; whether a zero
    /// exit code is acceptable is the caller's judgment.
    #[error("exited without a forwarded signal ({status}); output:\n{output}")]
    UnexpectedExit {
        /// The child's raw exit status (code or killing signal).
        status: ExitStatus,
        /// Everything the child wrote before exiting.
        output: String,
    },

    /// The child process could not be started at all.
    ///
    /// Immediate terminal failure; no timeout or signal handling applies.
    #[error("failed to spawn {program:?}: {source}")]
    SpawnFailure {
        /// The executable that could not be launched.
        program: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// A group member failed; the group drained the rest before returning this.
    #[error("member {member:?} failed: {source}")]
    MemberFailure {
        /// Name of the first member that failed.
        member: String,
        /// The member's own terminal error.
        #[source]
        source: Box<RunError>,
    },

    /// A member completed before the group became ready.
    ///
    /// A member that returns while the group is still starting would leave the
    /// readiness barrier waiting forever, so the group aborts startup instead.
    #[error("{name:?} exited before the group became ready")]
    ExitedBeforeReady {
        /// Name of the member that exited early.
        name: String,
    },

    /// Non-recoverable internal condition (e.g. a supervised future panicked).
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },
}

impl RunError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::RunError;
    /// use std::time::Duration;
    ///
    /// let err = RunError::StartupTimeout {
    ///     marker: "started".into(),
    ///     timeout: Duration::from_secs(5),
    ///     output: String::new(),
    /// };
    /// assert_eq!(err.as_label(), "startup_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RunError::StartupTimeout { .. } => "startup_timeout",
            RunError::UnexpectedExit { .. } => "unexpected_exit",
            RunError::SpawnFailure { .. } => "spawn_failure",
            RunError::MemberFailure { .. } => "member_failure",
            RunError::ExitedBeforeReady { .. } => "exited_before_ready",
            RunError::Fatal { .. } => "fatal",
        }
    }

    /// Returns a human-readable message with details about the error.
    ///
    /// Unlike the `Display` impl, this never includes the captured child
    /// output, so it stays one line for logs.
    pub fn as_message(&self) -> String {
        match self {
            RunError::StartupTimeout {
                marker, timeout, ..
            } => {
                format!("marker {marker:?} not seen within {timeout:?}")
            }
            RunError::UnexpectedExit { status, .. } => {
                format!("unexpected exit: {status}")
            }
            RunError::SpawnFailure { program, source } => {
                format!("spawn {program:?}: {source}")
            }
            RunError::MemberFailure { member, source } => {
                format!("member {member:?}: {}", source.as_message())
            }
            RunError::ExitedBeforeReady { name } => {
                format!("{name:?} exited before group readiness")
            }
            RunError::Fatal { error } => format!("fatal: {error}"),
        }
    }

    /// Descends through [`RunError::MemberFailure`] wrappers to the original
    /// failure. Useful when inspecting nested group errors.
    ///
    /// # Example
    /// ```
    /// use procvisor::RunError;
    ///
    /// let inner = RunError::Fatal { error: "boom".into() };
    /// let wrapped = RunError::MemberFailure {
    ///     member: "api".into(),
    ///     source: Box::new(inner),
    /// };
    /// assert_eq!(wrapped.root().as_label(), "fatal");
    /// ```
    pub fn root(&self) -> &RunError {
        match self {
            RunError::MemberFailure { source, .. } => source.root(),
            other => other,
        }
    }
}
