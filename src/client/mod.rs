//! Completion-service client for OpenAI-compatible chat-completions APIs.

mod request;
mod response;

pub use request::{ChatMessage, ChatRole, CompletionRequest, DecodingParams};
pub use response::{
    ChatCompletion, Choice, ChoiceMessage, CompletionUsage, ErrorDetail, ErrorResponse,
};

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use secrecy::{ExposeSecret, SecretString};

use crate::config::ApiSettings;
use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// The one operation the dispatcher needs from a completion service.
#[async_trait]
pub trait CompletionClient: Send + Sync + Debug {
    fn name(&self) -> &'static str {
        "completion"
    }

    /// Sends one request and returns the first choice's message text.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

pub struct Client {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn from_settings(settings: &ApiSettings) -> Result<Self> {
        let mut builder = Self::builder()
            .base_url(&settings.base_url)
            .timeout(settings.timeout);
        if let Some(ref key) = settings.api_key {
            builder = builder.api_key(key.expose_secret());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub async fn send(&self, request: &CompletionRequest) -> Result<ChatCompletion> {
        request.validate()?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Sending completion request"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(self.api_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64);
            return Err(Error::RateLimit { retry_after });
        }

        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(match serde_json::from_slice::<ErrorResponse>(&body) {
                Ok(error) => error.into_error(status.as_u16()),
                Err(_) => Error::Api {
                    message: String::from_utf8_lossy(&body).into_owned(),
                    status: Some(status.as_u16()),
                    error_type: None,
                },
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON body: {}", e)))?;
        ChatCompletion::from_body(json, status.as_u16())
    }
}

#[async_trait]
impl CompletionClient for Client {
    fn name(&self) -> &'static str {
        "chat-completions"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let completion = self.send(&request).await?;
        if let Some(usage) = completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Provider usage"
            );
        }
        completion.first_text().map(str::to_string)
    }
}

impl Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ClientBuilder {
    api_key: Option<SecretString>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    http: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Reads `GROQ_API_KEY` and, if set, `GROQ_BASE_URL`.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GROQ_API_KEY").ok().map(SecretString::from),
            base_url: std::env::var("GROQ_BASE_URL").ok(),
            ..Default::default()
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses a preconfigured HTTP client; `timeout` is then ignored.
    pub fn http(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<Client> {
        let api_key = self
            .api_key
            .filter(|k| !k.expose_secret().trim().is_empty())
            .ok_or_else(|| Error::Config("completion API key is not set".into()))?;

        let raw_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let parsed = url::Url::parse(&raw_url)
            .map_err(|e| Error::Config(format!("invalid base URL '{}': {}", raw_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "base URL must use http or https: {}",
                raw_url
            )));
        }

        let http = match self.http {
            Some(http) => http,
            None => reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .map_err(Error::Network)?,
        };

        Ok(Client {
            http,
            base_url: raw_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_api_key() {
        let err = Client::builder().build().unwrap_err();
        assert!(err.is_configuration_error());

        let err = Client::builder().api_key("  ").build().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let err = Client::builder()
            .api_key("gsk-test")
            .base_url("not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invalid base URL"));

        let err = Client::builder()
            .api_key("gsk-test")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = Client::builder()
            .api_key("gsk-test")
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_debug_redacts_key() {
        let client = Client::builder().api_key("gsk-secret").build().unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("gsk-secret"));
        assert!(debug.contains(DEFAULT_BASE_URL));
    }
}
