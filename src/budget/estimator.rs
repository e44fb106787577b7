//! Token estimation.
//!
//! The provider bills real tokenizer tokens; this crate approximates them by
//! counting whitespace-delimited words. Swapping in a real tokenizer changes
//! every quota calculation, so limits and buffers must be revisited with it.

use std::fmt::Debug;

pub trait TokenEstimator: Send + Sync + Debug {
    fn estimate(&self, text: &str) -> u64;

    /// Cost of one request: the text it carries plus the answer tokens it may
    /// consume, since the quota counts both.
    fn request_cost(&self, text: &str, max_answer_tokens: u32) -> u64 {
        self.estimate(text) + u64::from(max_answer_tokens)
    }
}

/// One token per whitespace-delimited word.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCountEstimator;

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> u64 {
        crate::types::word_count(text) as u64
    }
}
