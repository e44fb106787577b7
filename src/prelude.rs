//! Prelude module for convenient imports.
//!
//! ```rust
//! use docqa::prelude::*;
//! ```

pub use crate::answer::{Aggregate, Aggregator, Summarizer};
pub use crate::budget::{BudgetTracker, Clock, Reserve, TokenEstimator, WordCountEstimator};
pub use crate::client::{Client, CompletionClient, CompletionRequest, DecodingParams};
pub use crate::config::{ConfigBuilder, ConfigProvider, DispatchConfig};
pub use crate::dispatch::{Dispatcher, QueryPhase, Sleeper};
pub use crate::observability::MetricsRegistry;
pub use crate::query::{QueryRequest, QueryService};
pub use crate::types::{Answer, Chunk, ChunkResult, Document, QueryResponse};
pub use crate::{Error, ErrorCategory, Result};
pub use tokio_util::sync::CancellationToken;
