//! Query entry point: validate, select documents, dispatch, render.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CompletionClient;
use crate::config::DispatchConfig;
use crate::dispatch::Dispatcher;
use crate::observability::MetricsRegistry;
use crate::types::{Answer, Document, QueryResponse};
use crate::{Error, Result};

/// A question about the documents of one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    /// Origin whose documents are searched
    #[serde(default)]
    pub source: Option<String>,
}

impl QueryRequest {
    pub fn new(question: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            source: Some(source.into()),
        }
    }

    /// Trimmed question and source, or a validation error naming what is missing.
    pub fn validate(&self) -> Result<(&str, &str)> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(Error::validation("a question is required"));
        }
        let source = self
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::validation("a source must be selected"))?;
        Ok((question, source))
    }
}

#[derive(Debug, Clone)]
pub struct QueryService {
    dispatcher: Dispatcher,
}

impl QueryService {
    pub fn new(client: Arc<dyn CompletionClient>, config: DispatchConfig) -> Result<Self> {
        Ok(Self::from_dispatcher(Dispatcher::new(client, config)?))
    }

    pub fn from_dispatcher(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.dispatcher.metrics()
    }

    /// Runs `request` against the documents of its source and renders
    /// `{"answer": ...}` or `{"error": ...}`.
    pub async fn ask(
        &self,
        request: &QueryRequest,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> QueryResponse {
        let result = self.try_ask(request, documents, cancel).await;
        if let Err(ref e) = result {
            tracing::info!(category = ?e.category(), error = %e, "Query rejected or failed");
        }
        QueryResponse::from(result)
    }

    pub async fn try_ask(
        &self,
        request: &QueryRequest,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let (question, source) = request.validate()?;
        let selected = Document::select_by_origin(documents, source);
        if selected.is_empty() {
            return Err(Error::not_found(source));
        }
        tracing::debug!(source, documents = selected.len(), "Selected documents");
        self.dispatcher.dispatch(question, &selected, cancel).await
    }

    /// Answers over documents the caller has already selected.
    pub async fn answer(
        &self,
        question: &str,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        self.dispatcher.dispatch(question, documents, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let ok = QueryRequest::new("  What changed? ", " https://example.com ");
        assert_eq!(ok.validate().unwrap(), ("What changed?", "https://example.com"));

        let no_question = QueryRequest::new("   ", "https://example.com");
        assert!(matches!(no_question.validate(), Err(Error::Validation(_))));

        let no_source = QueryRequest {
            question: "What changed?".into(),
            source: None,
        };
        assert!(matches!(no_source.validate(), Err(Error::Validation(_))));

        let blank_source = QueryRequest::new("What changed?", "");
        assert!(matches!(blank_source.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_request_deserializes_without_source() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"question": "Who signed it?"}"#).unwrap();
        assert_eq!(request.source, None);
    }
}
