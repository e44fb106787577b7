//! Chunks of a document and the outcome of dispatching them.

use serde::{Deserialize, Serialize};

/// A word-bounded slice of one document, positioned within the query.
///
/// Indices are zero-based; [`Chunk::document_position`] and
/// [`Chunk::chunk_position`] give the one-based `i of N` form used in prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_index: usize,
    pub document_count: usize,
    pub document_label: String,
    pub chunk_index: usize,
    pub chunk_count: usize,
    pub text: String,
    pub word_count: usize,
}

impl Chunk {
    pub fn is_first(&self) -> bool {
        self.chunk_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.chunk_index + 1 == self.chunk_count
    }

    pub fn document_position(&self) -> (usize, usize) {
        (self.document_index + 1, self.document_count)
    }

    pub fn chunk_position(&self) -> (usize, usize) {
        (self.chunk_index + 1, self.chunk_count)
    }
}

/// Answer to one chunk. Created once per sent request and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub document_index: usize,
    pub chunk_index: usize,
    pub text: String,
    pub tokens_charged: u64,
}

impl ChunkResult {
    pub fn new(chunk: &Chunk, text: impl Into<String>, tokens_charged: u64) -> Self {
        Self {
            document_index: chunk.document_index,
            chunk_index: chunk.chunk_index,
            text: text.into(),
            tokens_charged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(chunk_index: usize, chunk_count: usize) -> Chunk {
        Chunk {
            document_index: 1,
            document_count: 3,
            document_label: "report.pdf".into(),
            chunk_index,
            chunk_count,
            text: "some words".into(),
            word_count: 2,
        }
    }

    #[test]
    fn test_positions() {
        let single = chunk(0, 1);
        assert!(single.is_first());
        assert!(single.is_last());

        let middle = chunk(1, 3);
        assert!(!middle.is_first());
        assert!(!middle.is_last());
        assert_eq!(middle.document_position(), (2, 3));
        assert_eq!(middle.chunk_position(), (2, 3));
    }

    #[test]
    fn test_result_references_chunk() {
        let result = ChunkResult::new(&chunk(2, 3), "answer", 42);
        assert_eq!(result.document_index, 1);
        assert_eq!(result.chunk_index, 2);
        assert_eq!(result.tokens_charged, 42);
    }
}
