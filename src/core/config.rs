//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the supervisor runtime.
//!
//! Config is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//! 2. **ProcessSpec defaults**: `ProcessSpec::with_defaults(&config)`
//!
//! ## Sentinel values
//! - `start_timeout = 0s` → no startup deadline (treated as `None` by
//!   [`Config::default_start_timeout`])

use std::time::Duration;

use crate::runners::DEFAULT_START_TIMEOUT;

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `start_timeout`: default deadline for readiness-marker detection
///   (`0s` = no deadline); only applies to specs with a non-empty marker
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by `Bus`)
#[derive(Clone, Debug)]
pub struct Config {
    /// Default startup deadline inherited by
    /// [`ProcessSpec::with_defaults`](crate::ProcessSpec::with_defaults).
    ///
    /// The deadline only runs while a non-empty readiness marker is
    /// configured; an empty marker means ready immediately, no deadline.
    pub start_timeout: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// will receive `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the default startup deadline as an `Option`.
    ///
    /// - `None` → no deadline
    /// - `Some(d)` → applied to specs that do not override it
    #[inline]
    pub fn default_start_timeout(&self) -> Option<Duration> {
        if self.start_timeout == Duration::ZERO {
            None
        } else {
            Some(self.start_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `start_timeout = 5s` (marker must appear within 5 seconds)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            start_timeout: DEFAULT_START_TIMEOUT,
            bus_capacity: 1024,
        }
    }
}
