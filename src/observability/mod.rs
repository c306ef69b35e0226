//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Per-view counters
//!
//! Observability is read-only: nothing here changes queue behavior.
//!
//! # Usage
//!
//! ```ignore
//! use queueview::observability::{Event, Logger};
//!
//! Logger::event(Event::QueueViewOpened, &[("name", "orders")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, QueueMetrics};
