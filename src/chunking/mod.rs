//! Word-bounded chunking of document text.
//!
//! Text is split on whitespace and regrouped into runs of exactly `size`
//! words; only the final chunk may be shorter. Joining the chunks with single
//! spaces reproduces the input with whitespace runs collapsed, so no word is
//! ever dropped or duplicated.

use std::borrow::Borrow;
use std::num::NonZeroUsize;

use crate::types::{Chunk, Document};
use crate::{Error, Result};

/// Default number of words per chunk.
pub const DEFAULT_CHUNK_SIZE_WORDS: usize = 1500;

/// Splits `text` into consecutive chunks of `chunk_size_words` words.
///
/// Whitespace-only text yields no chunks. A zero chunk size is a
/// configuration error.
pub fn chunk(text: &str, chunk_size_words: usize) -> Result<Vec<String>> {
    let size = NonZeroUsize::new(chunk_size_words)
        .ok_or_else(|| Error::Config("chunk size must be at least one word".into()))?;
    Ok(split_words(text, size))
}

fn split_words(text: &str, size: NonZeroUsize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size.get()).map(|w| w.join(" ")).collect()
}

/// Chunk planner for a whole query.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: NonZeroUsize,
}

impl Chunker {
    pub fn new(chunk_size_words: usize) -> Result<Self> {
        NonZeroUsize::new(chunk_size_words)
            .map(|size| Self { size })
            .ok_or_else(|| Error::Config("chunk size must be at least one word".into()))
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        split_words(text, self.size)
    }

    /// Chunks every document in order, tagging each chunk with its
    /// document and chunk position. Blank documents still count towards the
    /// document total but contribute no chunks.
    pub fn plan<D: Borrow<Document>>(&self, documents: &[D]) -> Vec<Chunk> {
        let document_count = documents.len();
        let mut plan = Vec::new();

        for (document_index, document) in documents.iter().enumerate() {
            let document = document.borrow();
            let texts = self.chunk(&document.text);
            let chunk_count = texts.len();

            plan.extend(texts.into_iter().enumerate().map(|(chunk_index, text)| Chunk {
                document_index,
                document_count,
                document_label: document.label.clone(),
                chunk_index,
                chunk_count,
                word_count: crate::types::word_count(&text),
                text,
            }));
        }

        plan
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE_WORDS).unwrap_or(NonZeroUsize::MIN),
        }
    }
}
