//! Chat-completion response and error payloads.

use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Token usage as billed by the provider.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CompletionUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatCompletion {
    /// Parses a 2xx body. An embedded `error` object is a provider error; a
    /// body without `choices[0].message.content` is malformed.
    pub fn from_body(body: serde_json::Value, status: u16) -> Result<Self> {
        if body.get("error").is_some_and(|e| e.is_object()) {
            let error: ErrorResponse = serde_json::from_value(body)
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            return Err(error.into_error(status));
        }

        serde_json::from_value(body).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Text of the first choice.
    pub fn first_text(&self) -> Result<&str> {
        self.choices
            .first()
            .ok_or_else(|| Error::MalformedResponse("response has no choices".into()))?
            .message
            .content
            .as_deref()
            .ok_or_else(|| Error::MalformedResponse("first choice has no message content".into()))
    }
}

/// OpenAI-style error body: `{"error": {"message", "type", "code"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn into_error(self, status: u16) -> Error {
        Error::Api {
            message: self.error.message,
            status: Some(status),
            error_type: self.error.error_type,
        }
    }
}
