//! # docqa
//!
//! Answer questions over documents that are too long for a single completion
//! call. Documents are split into word-bounded chunks, each chunk is sent to an
//! OpenAI-compatible chat-completions endpoint while staying inside the
//! provider's tokens-per-minute quota, and the per-chunk answers are joined in
//! order and condensed when they grow too long.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use docqa::{Client, DispatchConfig, Document, QueryRequest, QueryService};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), docqa::Error> {
//!     let config = DispatchConfig::default();
//!     let client = Client::builder().api_key("gsk-...").build()?;
//!     let service = QueryService::new(Arc::new(client), config)?;
//!
//!     let documents = vec![Document::new("annual-report.pdf", "...", "https://example.com/reports")];
//!     let request = QueryRequest::new("What was the revenue?", "https://example.com/reports");
//!
//!     let response = service
//!         .ask(&request, &documents, &CancellationToken::new())
//!         .await;
//!     println!("{}", serde_json::to_string(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Token accounting
//!
//! Token usage is approximated by counting whitespace-delimited words
//! ([`WordCountEstimator`]). The estimate of one request is the word count of
//! the text it carries plus the maximum number of answer tokens requested,
//! since the quota covers prompt and completion tokens alike.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod answer;
pub mod budget;
pub mod chunking;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod observability;
pub mod prelude;
pub mod query;
pub mod testing;
pub mod types;

pub use answer::{Aggregate, Aggregator, Summarizer};
pub use budget::{
    BudgetPermit, BudgetSnapshot, BudgetTracker, Clock, ManualClock, Reservation, Reserve,
    SystemClock, TokenEstimator, WordCountEstimator,
};
pub use chunking::{Chunker, chunk};
pub use client::{
    ChatMessage, ChatRole, Client, ClientBuilder, CompletionClient, CompletionRequest,
    DecodingParams,
};
pub use config::{ConfigBuilder, ConfigError, ConfigProvider, DispatchConfig};
pub use dispatch::{Dispatcher, PacingPolicy, QueryPhase, Sleeper, TokioSleeper};
pub use observability::{MetricsRegistry, MetricsSummary};
pub use query::{QueryRequest, QueryService};
pub use types::{Answer, Chunk, ChunkResult, Document, QueryResponse};

/// Error type for docqa operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The query was rejected before any request was sent.
    #[error("Invalid query: {0}")]
    Validation(String),

    /// No documents are available for the selected source.
    #[error("No documents found for source '{origin}'")]
    NotFound { origin: String },

    /// The completion service returned an error payload.
    #[error("Completion service error (HTTP {}): {message}", display_status(.status))]
    Api {
        message: String,
        status: Option<u16>,
        error_type: Option<String>,
    },

    /// The completion service rejected the request for exceeding its rate limit.
    #[error("Rate limit exceeded{}", display_retry_after(.retry_after))]
    RateLimit {
        retry_after: Option<std::time::Duration>,
    },

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// A success response did not carry the expected answer.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single request costs more than a whole budget window allows.
    #[error("Request needs {estimated} tokens but a window only admits {capacity}")]
    RequestTooLarge { estimated: u64, capacity: u64 },

    /// The caller cancelled the query.
    #[error("Query cancelled")]
    Cancelled,

    /// File system operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}

fn display_retry_after(retry_after: &Option<std::time::Duration>) -> String {
    retry_after.map_or_else(String::new, |d| format!(", retry in {:.0}s", d.as_secs_f64()))
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing question or source selection
    Validation,
    /// Nothing to dispatch for the selected source
    NotFound,
    /// Network, provider, or malformed-response failures during dispatch
    Transient,
    /// Configuration bounds that no amount of waiting can satisfy
    Configuration,
    /// Aborted by the caller
    Cancelled,
    /// Internal errors (IO, JSON)
    Internal,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn not_found(origin: impl Into<String>) -> Self {
        Error::NotFound {
            origin: origin.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Api { .. }
            | Error::RateLimit { .. }
            | Error::Network(_)
            | Error::MalformedResponse(_) => ErrorCategory::Transient,
            Error::Config(_) | Error::RequestTooLarge { .. } => ErrorCategory::Configuration,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Json(_) | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the same query could succeed if the caller tried again later.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            Error::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            Error::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound { key } => {
                Error::Config(format!("Key not found: {}", key))
            }
            config::ConfigError::InvalidValue { key, message } => {
                Error::Config(format!("Invalid value for {}: {}", key, message))
            }
            config::ConfigError::Serialization(e) => Error::Json(e),
            config::ConfigError::Io(e) => Error::Io(e),
            config::ConfigError::Env(e) => Error::Config(e.to_string()),
            config::ConfigError::Provider { message } => Error::Config(message),
            config::ConfigError::ValidationErrors(errors) => Error::Config(errors.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
