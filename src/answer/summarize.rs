use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::Result;
use crate::client::DecodingParams;
use crate::dispatch::BudgetGate;
use crate::dispatch::prompt::summary_request;

/// Condenses an over-long aggregate with one more completion request.
///
/// The request goes through the same budget gate as chunk requests but is
/// not followed by a pacing delay. The aggregate is sent whole, so a very
/// long aggregate can exceed a window and fail with
/// [`Error::RequestTooLarge`](crate::Error::RequestTooLarge).
#[derive(Debug, Clone)]
pub struct Summarizer {
    gate: BudgetGate,
    model: String,
    decoding: DecodingParams,
    target_words: usize,
}

impl Summarizer {
    pub fn new(
        gate: BudgetGate,
        model: impl Into<String>,
        decoding: DecodingParams,
        target_words: usize,
    ) -> Self {
        Self {
            gate,
            model: model.into(),
            decoding,
            target_words,
        }
    }

    pub fn target_words(&self) -> usize {
        self.target_words
    }

    pub async fn summarize(&self, aggregate: &str, cancel: &CancellationToken) -> Result<String> {
        self.summarize_for(&Uuid::new_v4(), aggregate, cancel).await
    }

    pub(crate) async fn summarize_for(
        &self,
        query_id: &Uuid,
        aggregate: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let request = summary_request(&self.model, aggregate, self.target_words, self.decoding);
        let sent = self.gate.send(query_id, request, aggregate, cancel).await?;
        tracing::debug!(
            query_id = %query_id,
            input_words = crate::types::word_count(aggregate),
            summary_words = crate::types::word_count(&sent.text),
            "Aggregate summarized"
        );
        Ok(sent.text)
    }
}
