//! Core data types shared across chunking, dispatch and aggregation.

mod answer;
mod chunk;
mod document;

pub use answer::{Answer, QueryResponse};
pub use chunk::{Chunk, ChunkResult};
pub use document::Document;

/// Number of whitespace-delimited words in `text`.
#[inline]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
