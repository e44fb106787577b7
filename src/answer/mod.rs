//! Turning per-chunk answers into the final answer.

mod aggregate;
mod summarize;

pub use aggregate::{Aggregate, Aggregator};
pub use summarize::Summarizer;
