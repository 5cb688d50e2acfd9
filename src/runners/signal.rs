//! # Opaque OS signal values forwarded between supervisor, groups, and children.
//!
//! The runtime never interprets a [`Signal`]; whatever arrives on a runner's
//! signal channel is forwarded verbatim to its children. On Unix the value maps
//! to the corresponding `nix` signal for delivery; elsewhere everything falls
//! back to hard process termination.

use std::fmt;

/// An operating-system interruption request, treated opaquely by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT (Ctrl-C in terminal).
    Interrupt,
    /// SIGTERM (default kill signal, used by systemd/Kubernetes).
    Terminate,
    /// SIGQUIT (hard stop, often used for core dumps).
    Quit,
    /// SIGKILL (cannot be caught by the child).
    Kill,
}

impl Signal {
    /// Conventional Unix name, for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Quit => "SIGQUIT",
            Signal::Kill => "SIGKILL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(unix)]
impl From<Signal> for nix::sys::signal::Signal {
    fn from(sig: Signal) -> Self {
        match sig {
            Signal::Interrupt => nix::sys::signal::Signal::SIGINT,
            Signal::Terminate => nix::sys::signal::Signal::SIGTERM,
            Signal::Quit => nix::sys::signal::Signal::SIGQUIT,
            Signal::Kill => nix::sys::signal::Signal::SIGKILL,
        }
    }
}
