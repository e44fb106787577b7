//! Structured span definitions for tracing.

use std::time::{Duration, Instant};

use tracing::{Level, Span, field, span};
use uuid::Uuid;

/// Span covering one query from chunking to the final answer.
pub struct QuerySpan {
    span: Span,
    start: Instant,
}

impl QuerySpan {
    pub fn new(query_id: Uuid, documents: usize) -> Self {
        let span = span!(
            Level::INFO,
            "query.dispatch",
            query_id = %query_id,
            documents = documents,
            chunks = field::Empty,
            summarized = field::Empty,
            is_error = field::Empty,
            duration_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_chunks(&self, chunks: usize) {
        self.span.record("chunks", chunks);
    }

    pub fn finish(self, summarized: Option<bool>) {
        match summarized {
            Some(summarized) => {
                self.span.record("summarized", summarized);
                self.span.record("is_error", false);
            }
            None => {
                self.span.record("is_error", true);
            }
        }
        self.span
            .record("duration_ms", self.start.elapsed().as_millis() as u64);
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Span around one call to the completion service.
pub struct CompletionSpan {
    span: Span,
    start: Instant,
}

impl CompletionSpan {
    pub fn new(model: &str, estimated_tokens: u64) -> Self {
        let span = span!(
            Level::DEBUG,
            "completion.call",
            model = model,
            estimated_tokens = estimated_tokens,
            response_words = field::Empty,
            is_error = field::Empty,
            latency_ms = field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn record_response(&self, words: usize) {
        self.span.record("response_words", words);
    }

    /// Closes the span and returns how long the call took.
    pub fn finish(self, success: bool) -> Duration {
        let latency = self.start.elapsed();
        self.span.record("is_error", !success);
        self.span.record("latency_ms", latency.as_millis() as u64);
        latency
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}
