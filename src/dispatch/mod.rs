//! Sequential, budget-gated dispatch of a query's chunks.
//!
//! For every chunk, in document-then-chunk order, the dispatcher reserves
//! budget (sleeping out the window when it is exhausted), sends one request,
//! commits its tokens and then pauses for the pacing delay. The first failure
//! aborts the query and discards partial answers.

mod gate;
mod pacing;
pub mod prompt;
mod state;

pub use gate::{BudgetGate, Sent};
pub use pacing::{PacingPolicy, Sleeper, TokioSleeper};
pub use state::QueryPhase;

use std::borrow::Borrow;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::answer::{Aggregator, Summarizer};
use crate::budget::{BudgetTracker, SystemClock, TokenEstimator, WordCountEstimator};
use crate::chunking::Chunker;
use crate::client::CompletionClient;
use crate::config::DispatchConfig;
use crate::observability::{MetricsRegistry, QuerySpan};
use crate::types::{Answer, ChunkResult, Document};
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
    chunker: Chunker,
    gate: BudgetGate,
    pacing: PacingPolicy,
    aggregator: Aggregator,
    summarizer: Summarizer,
    metrics: Arc<MetricsRegistry>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn CompletionClient>, config: DispatchConfig) -> Result<Self> {
        Self::builder(client, config).build()
    }

    pub fn builder(client: Arc<dyn CompletionClient>, config: DispatchConfig) -> DispatcherBuilder {
        DispatcherBuilder {
            client,
            config,
            tracker: None,
            estimator: None,
            sleeper: None,
            metrics: None,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<BudgetTracker> {
        self.gate.tracker()
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    /// Answers `question` from `documents`, in the order given.
    pub async fn dispatch<D: Borrow<Document>>(
        &self,
        question: &str,
        documents: &[D],
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let query_id = Uuid::new_v4();
        let span = QuerySpan::new(query_id, documents.len());
        let _active = self.metrics.record_query_start();

        let result = self
            .run(query_id, question, documents, cancel, &span)
            .instrument(span.span().clone())
            .await;

        self.metrics.record_query_end(result.is_ok());
        match &result {
            Ok(answer) => {
                span.finish(Some(answer.summarized));
            }
            Err(e) => {
                if matches!(e, Error::Cancelled) {
                    self.metrics.record_cancellation();
                }
                QueryPhase::Failed.enter(&query_id);
                tracing::warn!(query_id = %query_id, error = %e, "Query failed");
                span.finish(None);
            }
        }
        result
    }

    async fn run<D: Borrow<Document>>(
        &self,
        query_id: Uuid,
        question: &str,
        documents: &[D],
        cancel: &CancellationToken,
        span: &QuerySpan,
    ) -> Result<Answer> {
        if question.trim().is_empty() {
            return Err(Error::validation("question must not be empty"));
        }

        QueryPhase::Chunking.enter(&query_id);
        let plan = self.chunker.plan(documents);
        span.record_chunks(plan.len());
        if plan.is_empty() {
            return Err(Error::validation("the selected documents contain no text"));
        }
        tracing::info!(
            query_id = %query_id,
            documents = documents.len(),
            chunks = plan.len(),
            "Dispatching query"
        );

        let mut results = Vec::with_capacity(plan.len());
        for chunk in &plan {
            let request = prompt::chunk_request(
                &self.config.model,
                question,
                chunk,
                self.config.decoding,
            );
            let sent = self.gate.send(&query_id, request, &chunk.text, cancel).await?;
            tracing::debug!(
                query_id = %query_id,
                document = chunk.document_index,
                chunk = chunk.chunk_index,
                tokens = sent.tokens,
                "Chunk answered"
            );
            results.push(ChunkResult::new(chunk, sent.text, sent.tokens));

            QueryPhase::Pacing.enter(&query_id);
            self.pacing.pace(cancel).await?;
        }

        QueryPhase::Aggregating.enter(&query_id);
        let aggregate = self.aggregator.aggregate(&results);

        let (text, summarized) = if aggregate.needs_summary {
            QueryPhase::Summarizing.enter(&query_id);
            let summary = self
                .summarizer
                .summarize_for(&query_id, &aggregate.text, cancel)
                .await?;
            self.metrics.record_summary();
            (summary, true)
        } else {
            (aggregate.text.clone(), false)
        };

        QueryPhase::Done.enter(&query_id);
        tracing::info!(
            query_id = %query_id,
            chunks = results.len(),
            aggregate_words = aggregate.word_count,
            summarized,
            "Query answered"
        );

        Ok(Answer {
            query_id,
            results,
            aggregate: aggregate.text,
            text,
            summarized,
            completed_at: Utc::now(),
        })
    }
}

/// Assembles a [`Dispatcher`], defaulting every collaborator that is not set.
pub struct DispatcherBuilder {
    client: Arc<dyn CompletionClient>,
    config: DispatchConfig,
    tracker: Option<Arc<BudgetTracker>>,
    estimator: Option<Arc<dyn TokenEstimator>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl DispatcherBuilder {
    /// Shares a tracker with other dispatchers drawing on the same quota.
    pub fn tracker(mut self, tracker: Arc<BudgetTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub fn estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let config = self.config;
        config.validate()?;

        let tracker = match self.tracker {
            Some(tracker) => tracker,
            None => Arc::new(BudgetTracker::with_clock(
                config.budget.limit,
                config.budget.buffer,
                config.budget.window,
                Arc::new(SystemClock),
            )?),
        };
        let estimator = self
            .estimator
            .unwrap_or_else(|| Arc::new(WordCountEstimator));
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));
        let metrics = self.metrics.unwrap_or_default();

        let pacing = PacingPolicy::new(config.pacing_delay, sleeper);
        let gate = BudgetGate::new(
            self.client,
            tracker,
            estimator,
            pacing.clone(),
            metrics.clone(),
        );

        Ok(Dispatcher {
            chunker: Chunker::new(config.chunk_size_words)?,
            aggregator: Aggregator::new(config.summary.threshold_words),
            summarizer: Summarizer::new(
                gate.clone(),
                config.model.clone(),
                config.decoding,
                config.summary.target_words,
            ),
            gate,
            pacing,
            metrics,
            config,
        })
    }
}

impl std::fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
