//! # Event subscribers for the procvisor runtime.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery for
//! handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Runner ── publish(Event) ──► Bus ──► Supervisor listener ──► SubscriberSet
//!                                                                    │
//!                                                          ┌─────────┼─────────┐
//!                                                          ▼         ▼         ▼
//!                                                      LogWriter  Metrics   Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use async_trait::async_trait;
//! use procvisor::{Event, EventKind, Subscribe};
//!
//! struct MetricsSubscriber;
//!
//! #[async_trait]
//! impl Subscribe for MetricsSubscriber {
//!     async fn on_event(&self, event: &Event) {
//!         if event.kind == EventKind::RunnerFailed {
//!             // increment failure counter
//!         }
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
