//! Budget-gated sending of a single completion request.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use super::pacing::PacingPolicy;
use super::state::QueryPhase;
use crate::budget::{BudgetTracker, Reserve, TokenEstimator};
use crate::client::{CompletionClient, CompletionRequest};
use crate::observability::{CompletionSpan, MetricsRegistry};
use crate::{Error, Result};

/// A completion that was sent and charged to the budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    /// Response text with surrounding whitespace removed
    pub text: String,
    pub tokens: u64,
}

/// Reserve, wait, send and commit for one request.
///
/// The budget permit is held from the first reserve until the commit, so
/// queries sharing the tracker are serialized around each request.
#[derive(Debug, Clone)]
pub struct BudgetGate {
    client: Arc<dyn CompletionClient>,
    tracker: Arc<BudgetTracker>,
    estimator: Arc<dyn TokenEstimator>,
    pacing: PacingPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl BudgetGate {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        tracker: Arc<BudgetTracker>,
        estimator: Arc<dyn TokenEstimator>,
        pacing: PacingPolicy,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            client,
            tracker,
            estimator,
            pacing,
            metrics,
        }
    }

    pub fn tracker(&self) -> &Arc<BudgetTracker> {
        &self.tracker
    }

    /// Cost charged for a request carrying `billed_text`: its estimated
    /// tokens plus the request's answer cap. Prompt framing is not billed.
    pub fn estimate(&self, billed_text: &str, request: &CompletionRequest) -> u64 {
        self.estimator.request_cost(billed_text, request.max_tokens)
    }

    /// Sends `request`, charging the budget for `billed_text` (the chunk or
    /// aggregate the request carries) plus the answer cap.
    pub async fn send(
        &self,
        query_id: &Uuid,
        request: CompletionRequest,
        billed_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Sent> {
        let estimated = self.estimate(billed_text, &request);

        let mut permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.tracker.acquire() => permit,
        };

        let reservation = loop {
            QueryPhase::Reserving.enter(query_id);
            match permit.reserve(estimated)? {
                Reserve::Granted(reservation) => break reservation,
                Reserve::Wait(wait) => {
                    QueryPhase::Waiting.enter(query_id);
                    self.metrics.record_budget_wait(wait);
                    self.pacing.budget_wait(wait, cancel).await?;
                    permit.reset();
                }
            }
        };

        QueryPhase::Sending.enter(query_id);
        let span = CompletionSpan::new(&request.model, estimated);
        let call = self
            .client
            .complete(request)
            .instrument(span.span().clone());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = call => Some(result),
        };

        let text = match outcome {
            None => {
                // In-flight request abandoned; its reservation is never committed.
                drop(reservation);
                let latency = span.finish(false);
                tracing::debug!(
                    latency_ms = latency.as_millis() as u64,
                    "Completion request cancelled"
                );
                return Err(Error::Cancelled);
            }
            Some(Err(e)) => {
                let latency = span.finish(false);
                self.metrics.record_request(false, latency);
                tracing::warn!(
                    client = self.client.name(),
                    error = %e,
                    "Completion request failed"
                );
                return Err(e);
            }
            Some(Ok(text)) => text,
        };

        let text = text.trim().to_string();
        span.record_response(crate::types::word_count(&text));
        let latency = span.finish(true);
        self.metrics.record_request(true, latency);

        QueryPhase::Recording.enter(query_id);
        let tokens = reservation.tokens();
        permit.commit(reservation);
        self.metrics.record_commit(tokens);
        tracing::debug!(
            tokens,
            consumed = permit.snapshot().consumed,
            "Committed request tokens"
        );

        Ok(Sent { text, tokens })
    }
}
