//! # Cross-platform OS signal handling.
//!
//! Provides [`wait_for_os_signal`] an async helper that completes when the
//! process receives a termination signal, reporting **which** signal fired so
//! the supervisor can forward the same value downstream.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal, often used for core dumps or hard stop)
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`], reported as [`Signal::Interrupt`]

use crate::runners::Signal;

/// Waits for a termination signal and reports which one arrived.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(signal)` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(unix)]
pub async fn wait_for_os_signal() -> std::io::Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    let sig = tokio::select! {
        _ = sigint.recv()  => Signal::Interrupt,
        _ = sigterm.recv() => Signal::Terminate,
        _ = sigquit.recv() => Signal::Quit,
    };
    Ok(sig)
}

/// Waits for a termination signal and reports which one arrived.
///
/// Each call creates independent signal listeners.
///
/// Returns `Ok(signal)` when any signal is received, or `Err` if signal
/// registration fails.
#[cfg(not(unix))]
pub async fn wait_for_os_signal() -> std::io::Result<Signal> {
    tokio::signal::ctrl_c().await.map(|_| Signal::Interrupt)
}
