use serde::Serialize;

use crate::config::settings::DEFAULT_SUMMARY_THRESHOLD_WORDS;
use crate::types::{ChunkResult, word_count};

const SEPARATOR: &str = "\n\n";

/// Chunk answers joined in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub text: String,
    pub word_count: usize,
    /// Whether `word_count` exceeds the summary threshold
    pub needs_summary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    threshold_words: usize,
}

impl Aggregator {
    pub fn new(threshold_words: usize) -> Self {
        Self { threshold_words }
    }

    pub fn threshold_words(&self) -> usize {
        self.threshold_words
    }

    /// Joins `results` by blank lines without reordering them.
    pub fn aggregate(&self, results: &[ChunkResult]) -> Aggregate {
        let text = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        let word_count = word_count(&text);
        Aggregate {
            needs_summary: word_count > self.threshold_words,
            word_count,
            text,
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SUMMARY_THRESHOLD_WORDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(document_index: usize, chunk_index: usize, text: &str) -> ChunkResult {
        ChunkResult {
            document_index,
            chunk_index,
            text: text.to_string(),
            tokens_charged: 0,
        }
    }

    #[test]
    fn test_joins_in_order() {
        let results = vec![
            result(0, 0, "first answer"),
            result(0, 1, "second"),
            result(1, 0, "third one here"),
        ];
        let aggregate = Aggregator::default().aggregate(&results);
        assert_eq!(aggregate.text, "first answer\n\nsecond\n\nthird one here");
        assert_eq!(aggregate.word_count, 6);
        assert!(!aggregate.needs_summary);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let at_threshold = vec![result(0, 0, &vec!["w"; 400].join(" "))];
        assert!(!Aggregator::new(400).aggregate(&at_threshold).needs_summary);

        let over = vec![
            result(0, 0, &vec!["w"; 400].join(" ")),
            result(0, 1, "one"),
        ];
        assert!(Aggregator::new(400).aggregate(&over).needs_summary);
    }

    #[test]
    fn test_empty_results() {
        let aggregate = Aggregator::default().aggregate(&[]);
        assert_eq!(aggregate.text, "");
        assert_eq!(aggregate.word_count, 0);
        assert!(!aggregate.needs_summary);
    }
}
