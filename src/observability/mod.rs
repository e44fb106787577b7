//! Observability: structured spans and in-process metrics.
//!
//! The library only emits `tracing` events and spans; installing a subscriber
//! is left to the application.

mod metrics;
mod spans;

pub use metrics::{ActiveQuery, Counter, Gauge, Histogram, MetricsRegistry, MetricsSummary};
pub use spans::{CompletionSpan, QuerySpan};
