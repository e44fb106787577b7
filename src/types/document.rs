//! Source documents supplied by the caller.

use serde::{Deserialize, Serialize};

/// One extracted document to mine for an answer.
///
/// `origin` is the page or feed the document was discovered from; queries
/// select documents by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier shown to the model, usually the file name
    pub label: String,
    /// Extracted plain text
    pub text: String,
    /// Where the document came from
    pub origin: String,
}

impl Document {
    pub fn new(
        label: impl Into<String>,
        text: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            origin: origin.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        super::word_count(&self.text)
    }

    pub fn is_blank(&self) -> bool {
        self.text.split_whitespace().next().is_none()
    }

    /// Returns the documents originating from `origin`, keeping their order.
    pub fn select_by_origin<'a>(documents: &'a [Document], origin: &str) -> Vec<&'a Document> {
        documents.iter().filter(|d| d.origin == origin).collect()
    }
}
