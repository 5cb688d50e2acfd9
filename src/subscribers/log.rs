//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [starting] runner=unit
//! [spawning] runner=api
//! [ready] runner=api
//! [started] runner=unit
//! [shutdown-requested] signal=SIGTERM
//! [signal] runner=api signal=SIGTERM
//! [exited] runner=api status="signal: 15 (SIGTERM)"
//! [startup-timeout] runner=api timeout=5000ms
//! [failed] runner=api err="marker \"started\" not seen within 5s"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let runner = e.runner.as_deref().unwrap_or("?");
        let signal = e.signal.map(|s| s.as_str()).unwrap_or("?");
        match e.kind {
            EventKind::SupervisorStarting => {
                println!("[starting] runner={runner}");
            }
            EventKind::SupervisorStarted => {
                println!("[started] runner={runner}");
            }
            EventKind::ShutdownRequested => {
                println!("[shutdown-requested] signal={signal}");
            }
            EventKind::RunnerStarting => {
                println!("[spawning] runner={runner}");
            }
            EventKind::RunnerReady => {
                println!("[ready] runner={runner}");
            }
            EventKind::SignalForwarded => {
                println!("[signal] runner={runner} signal={signal}");
            }
            EventKind::RunnerExited => {
                println!(
                    "[exited] runner={runner} status={:?}",
                    e.status.as_deref().unwrap_or("")
                );
            }
            EventKind::StartupTimedOut => {
                println!(
                    "[startup-timeout] runner={runner} timeout={}ms",
                    e.timeout_ms.unwrap_or(0)
                );
            }
            EventKind::RunnerFailed => {
                println!(
                    "[failed] runner={runner} err={:?}",
                    e.reason.as_deref().unwrap_or("")
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
