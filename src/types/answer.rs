//! Final query output and its wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ChunkResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub query_id: Uuid,
    /// Per-chunk answers in document-then-chunk order
    pub results: Vec<ChunkResult>,
    /// Chunk answers joined by blank lines
    pub aggregate: String,
    /// What the caller sees: the summary when `summarized`, otherwise the aggregate
    pub text: String,
    pub summarized: bool,
    pub completed_at: DateTime<Utc>,
}

impl Answer {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens_charged(&self) -> u64 {
        self.results.iter().map(|r| r.tokens_charged).sum()
    }
}

/// Response body of the query entry point: `{"answer": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Answer { answer: String },
    Error { error: String },
}

impl QueryResponse {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            answer: text.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

impl From<crate::Result<Answer>> for QueryResponse {
    fn from(result: crate::Result<Answer>) -> Self {
        match result {
            Ok(answer) => Self::Answer {
                answer: answer.text,
            },
            Err(e) => Self::error(e.to_string()),
        }
    }
}
