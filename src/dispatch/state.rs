//! Query lifecycle phases.

use std::fmt;

use serde::Serialize;

/// Where a query currently is.
///
/// `Chunking -> (Reserving -> Waiting? -> Sending -> Recording -> Pacing)* ->
/// Aggregating -> Summarizing? -> Done`; a failed or cancelled step ends in
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPhase {
    Chunking,
    Reserving,
    Waiting,
    Sending,
    Recording,
    Pacing,
    Aggregating,
    Summarizing,
    Done,
    Failed,
}

impl QueryPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunking => "chunking",
            Self::Reserving => "reserving",
            Self::Waiting => "waiting",
            Self::Sending => "sending",
            Self::Recording => "recording",
            Self::Pacing => "pacing",
            Self::Aggregating => "aggregating",
            Self::Summarizing => "summarizing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Phases in which the query is suspended without doing work.
    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Waiting | Self::Pacing)
    }

    pub(crate) fn enter(self, query_id: &uuid::Uuid) {
        tracing::debug!(query_id = %query_id, phase = self.as_str(), "Query phase");
    }
}

impl fmt::Display for QueryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
