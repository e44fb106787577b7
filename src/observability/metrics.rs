//! Atomic in-process metrics.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Thread-safe atomic counter.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Thread-safe atomic gauge.
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Fixed-bucket histogram.
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<AtomicU64>,
    bucket_bounds: Vec<f64>,
    // Scaled by 1000 to keep sub-millisecond precision in an integer.
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    pub fn new(bucket_bounds: Vec<f64>) -> Self {
        let buckets = (0..=bucket_bounds.len())
            .map(|_| AtomicU64::new(0))
            .collect();
        Self {
            buckets,
            bucket_bounds,
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Request latency in milliseconds; completions routinely take seconds.
    pub fn default_latency() -> Self {
        Self::new(vec![
            100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0,
        ])
    }

    pub fn observe(&self, value: f64) {
        let bucket_idx = self
            .bucket_bounds
            .iter()
            .position(|&bound| value <= bound)
            .unwrap_or(self.bucket_bounds.len());

        self.buckets[bucket_idx].fetch_add(1, Ordering::Relaxed);
        self.sum
            .fetch_add((value.max(0.0) * 1000.0) as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum_ms(&self) -> f64 {
        self.sum.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Observation count per bucket; the last entry is the overflow bucket.
    pub fn bucket_counts(&self) -> Vec<u64> {
        self.buckets
            .iter()
            .map(|b| b.load(Ordering::Relaxed))
            .collect()
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum_ms() / n as f64,
        }
    }
}

/// Dispatch metrics, shared by every dispatcher that holds the registry.
#[derive(Debug)]
pub struct MetricsRegistry {
    pub queries_total: Counter,
    pub queries_failed: Counter,
    pub active_queries: Gauge,
    pub requests_sent: Counter,
    pub requests_failed: Counter,
    pub tokens_committed: Counter,
    pub budget_waits: Counter,
    pub budget_wait_ms: Counter,
    pub summaries: Counter,
    pub cancellations: Counter,
    pub request_latency_ms: Histogram,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            queries_total: Counter::new(),
            queries_failed: Counter::new(),
            active_queries: Gauge::new(),
            requests_sent: Counter::new(),
            requests_failed: Counter::new(),
            tokens_committed: Counter::new(),
            budget_waits: Counter::new(),
            budget_wait_ms: Counter::new(),
            summaries: Counter::new(),
            cancellations: Counter::new(),
            request_latency_ms: Histogram::default_latency(),
        }
    }

    /// Counts a query as started and active until the returned guard drops,
    /// including when the query future itself is dropped mid-flight.
    #[must_use = "the query stops counting as active when the guard drops"]
    pub fn record_query_start(&self) -> ActiveQuery<'_> {
        self.queries_total.inc();
        self.active_queries.inc();
        ActiveQuery { metrics: self }
    }

    pub fn record_query_end(&self, success: bool) {
        if !success {
            self.queries_failed.inc();
        }
    }

    pub fn record_request(&self, success: bool, latency: Duration) {
        self.requests_sent.inc();
        self.request_latency_ms
            .observe(latency.as_secs_f64() * 1000.0);
        if !success {
            self.requests_failed.inc();
        }
    }

    pub fn record_commit(&self, tokens: u64) {
        self.tokens_committed.add(tokens);
    }

    pub fn record_budget_wait(&self, wait: Duration) {
        self.budget_waits.inc();
        self.budget_wait_ms.add(wait.as_millis() as u64);
    }

    pub fn record_summary(&self) {
        self.summaries.inc();
    }

    pub fn record_cancellation(&self) {
        self.cancellations.inc();
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary::from_registry(self)
    }
}

/// Decrements the active-query gauge on drop.
#[derive(Debug)]
pub struct ActiveQuery<'a> {
    metrics: &'a MetricsRegistry,
}

impl Drop for ActiveQuery<'_> {
    fn drop(&mut self) {
        self.metrics.active_queries.dec();
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a [`MetricsRegistry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub total_queries: u64,
    pub failed_queries: u64,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub tokens_committed: u64,
    pub budget_waits: u64,
    pub budget_wait_ms: u64,
    pub summaries: u64,
    pub cancellations: u64,
    pub avg_latency_ms: f64,
}

impl MetricsSummary {
    pub fn from_registry(registry: &MetricsRegistry) -> Self {
        Self {
            total_queries: registry.queries_total.get(),
            failed_queries: registry.queries_failed.get(),
            total_requests: registry.requests_sent.get(),
            failed_requests: registry.requests_failed.get(),
            tokens_committed: registry.tokens_committed.get(),
            budget_waits: registry.budget_waits.get(),
            budget_wait_ms: registry.budget_wait_ms.get(),
            summaries: registry.summaries.get(),
            cancellations: registry.cancellations.get(),
            avg_latency_ms: registry.request_latency_ms.mean(),
        }
    }
}
