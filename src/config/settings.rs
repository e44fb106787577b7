//! Typed dispatch settings loaded from any [`ConfigProvider`].

use std::time::Duration;

use secrecy::SecretString;

use super::provider::{ConfigProvider, ConfigProviderExt};
use super::{ConfigError, ConfigResult, ValidationErrors};
use crate::budget::DEFAULT_WINDOW;
use crate::chunking::DEFAULT_CHUNK_SIZE_WORDS;
use crate::client::{DEFAULT_BASE_URL, DecodingParams};

pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TOKEN_LIMIT: u64 = 6000;
pub const DEFAULT_TOKEN_BUFFER: u64 = 500;
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(2);
pub const DEFAULT_SUMMARY_THRESHOLD_WORDS: usize = 400;
pub const DEFAULT_SUMMARY_TARGET_WORDS: usize = 100;
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(120);

/// Configuration keys understood by [`DispatchConfig::load`].
pub mod keys {
    pub const MODEL: &str = "model";
    pub const CHUNK_SIZE: &str = "chunk.size";
    pub const MAX_TOKENS: &str = "request.max_tokens";
    pub const TEMPERATURE: &str = "request.temperature";
    pub const TOP_P: &str = "request.top_p";
    pub const BUDGET_LIMIT: &str = "budget.limit";
    pub const BUDGET_BUFFER: &str = "budget.buffer";
    pub const BUDGET_WINDOW_SECS: &str = "budget.window_secs";
    pub const PACING_DELAY_MS: &str = "pacing.delay_ms";
    pub const SUMMARY_THRESHOLD_WORDS: &str = "summary.threshold_words";
    pub const SUMMARY_TARGET_WORDS: &str = "summary.target_words";
    pub const API_BASE_URL: &str = "api.base_url";
    pub const API_KEY: &str = "api.key";
    pub const API_TIMEOUT_SECS: &str = "api.timeout_secs";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetSettings {
    /// Tokens the provider admits per window
    pub limit: u64,
    /// Headroom kept below `limit`
    pub buffer: u64,
    pub window: Duration,
}

impl BudgetSettings {
    pub fn capacity(&self) -> u64 {
        self.limit.saturating_sub(self.buffer)
    }
}

impl Default for BudgetSettings {
    fn default() -> Self {
        Self {
            limit: DEFAULT_TOKEN_LIMIT,
            buffer: DEFAULT_TOKEN_BUFFER,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarySettings {
    /// Aggregates longer than this many words are summarized
    pub threshold_words: usize,
    pub target_words: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            threshold_words: DEFAULT_SUMMARY_THRESHOLD_WORDS,
            target_words: DEFAULT_SUMMARY_TARGET_WORDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_API_TIMEOUT,
        }
    }
}

/// Everything the dispatcher needs to run a query.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub model: String,
    pub chunk_size_words: usize,
    pub decoding: DecodingParams,
    pub budget: BudgetSettings,
    /// Courtesy delay after every successful chunk request
    pub pacing_delay: Duration,
    pub summary: SummarySettings,
    pub api: ApiSettings,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            chunk_size_words: DEFAULT_CHUNK_SIZE_WORDS,
            decoding: DecodingParams::default(),
            budget: BudgetSettings::default(),
            pacing_delay: DEFAULT_PACING_DELAY,
            summary: SummarySettings::default(),
            api: ApiSettings::default(),
        }
    }
}

impl DispatchConfig {
    /// Reads every known key, falling back to defaults for unset ones.
    pub async fn load<P: ConfigProvider + ?Sized>(provider: &P) -> ConfigResult<Self> {
        let defaults = Self::default();

        let config = Self {
            model: provider
                .get_string(keys::MODEL)
                .await?
                .unwrap_or(defaults.model),
            chunk_size_words: provider
                .get(keys::CHUNK_SIZE)
                .await?
                .unwrap_or(defaults.chunk_size_words),
            decoding: DecodingParams {
                temperature: provider
                    .get(keys::TEMPERATURE)
                    .await?
                    .unwrap_or(defaults.decoding.temperature),
                top_p: provider
                    .get(keys::TOP_P)
                    .await?
                    .unwrap_or(defaults.decoding.top_p),
                max_tokens: provider
                    .get(keys::MAX_TOKENS)
                    .await?
                    .unwrap_or(defaults.decoding.max_tokens),
            },
            budget: BudgetSettings {
                limit: provider
                    .get(keys::BUDGET_LIMIT)
                    .await?
                    .unwrap_or(defaults.budget.limit),
                buffer: provider
                    .get(keys::BUDGET_BUFFER)
                    .await?
                    .unwrap_or(defaults.budget.buffer),
                window: provider
                    .get::<u64>(keys::BUDGET_WINDOW_SECS)
                    .await?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.budget.window),
            },
            pacing_delay: provider
                .get::<u64>(keys::PACING_DELAY_MS)
                .await?
                .map(Duration::from_millis)
                .unwrap_or(defaults.pacing_delay),
            summary: SummarySettings {
                threshold_words: provider
                    .get(keys::SUMMARY_THRESHOLD_WORDS)
                    .await?
                    .unwrap_or(defaults.summary.threshold_words),
                target_words: provider
                    .get(keys::SUMMARY_TARGET_WORDS)
                    .await?
                    .unwrap_or(defaults.summary.target_words),
            },
            api: ApiSettings {
                base_url: provider
                    .get_string(keys::API_BASE_URL)
                    .await?
                    .unwrap_or(defaults.api.base_url),
                api_key: provider
                    .get_string(keys::API_KEY)
                    .await?
                    .map(SecretString::from),
                timeout: provider
                    .get::<u64>(keys::API_TIMEOUT_SECS)
                    .await?
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.api.timeout),
            },
        };

        tracing::debug!(
            provider = provider.name(),
            model = %config.model,
            chunk_size_words = config.chunk_size_words,
            limit = config.budget.limit,
            buffer = config.budget.buffer,
            "Loaded dispatch configuration"
        );
        Ok(config)
    }

    /// Tokens one full chunk request may cost: a full chunk plus the answer cap.
    pub fn chunk_request_cost(&self) -> u64 {
        self.chunk_size_words as u64 + u64::from(self.decoding.max_tokens)
    }

    /// Collects every violated bound instead of stopping at the first.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |key: &str, message: String| {
            errors.push(ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            })
        };

        if self.model.trim().is_empty() {
            invalid(keys::MODEL, "must not be empty".into());
        }
        if self.chunk_size_words == 0 {
            invalid(keys::CHUNK_SIZE, "must be at least 1 word".into());
        }
        if self.decoding.max_tokens == 0 {
            invalid(keys::MAX_TOKENS, "must be at least 1".into());
        }
        if !(0.0..=2.0).contains(&self.decoding.temperature) {
            invalid(
                keys::TEMPERATURE,
                format!("{} is outside 0..=2", self.decoding.temperature),
            );
        }
        if !(self.decoding.top_p > 0.0 && self.decoding.top_p <= 1.0) {
            invalid(
                keys::TOP_P,
                format!("{} is outside (0, 1]", self.decoding.top_p),
            );
        }
        if self.budget.buffer >= self.budget.limit {
            invalid(
                keys::BUDGET_BUFFER,
                format!(
                    "{} must be smaller than the limit {}",
                    self.budget.buffer, self.budget.limit
                ),
            );
        } else if self.chunk_request_cost() > self.budget.capacity() {
            invalid(
                keys::CHUNK_SIZE,
                format!(
                    "a full chunk request costs {} tokens but a window admits {}",
                    self.chunk_request_cost(),
                    self.budget.capacity()
                ),
            );
        }
        if self.budget.window.is_zero() {
            invalid(keys::BUDGET_WINDOW_SECS, "must be longer than zero".into());
        }
        if self.summary.target_words == 0 {
            invalid(keys::SUMMARY_TARGET_WORDS, "must be at least 1 word".into());
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            invalid(
                keys::API_BASE_URL,
                format!("'{}' is not a valid URL", self.api.base_url),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationErrors(ValidationErrors(errors)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigProvider;
    use secrecy::ExposeSecret;

    #[test]
    fn test_defaults_are_valid() {
        let config = DispatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size_words, 1500);
        assert_eq!(config.budget.capacity(), 5500);
        assert_eq!(config.pacing_delay, Duration::from_secs(2));
        assert_eq!(config.summary.threshold_words, 400);
    }

    #[tokio::test]
    async fn test_load_overrides() {
        let provider = MemoryConfigProvider::new()
            .value(keys::MODEL, "llama-3.3-70b-versatile")
            .value(keys::CHUNK_SIZE, 2000)
            .value(keys::TEMPERATURE, 0.0)
            .value(keys::BUDGET_LIMIT, 12000)
            .value(keys::BUDGET_WINDOW_SECS, 30)
            .value(keys::PACING_DELAY_MS, 5000)
            .value(keys::API_KEY, "gsk-from-config");

        let config = DispatchConfig::load(&provider).await.unwrap();
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.chunk_size_words, 2000);
        assert_eq!(config.decoding.temperature, 0.0);
        assert_eq!(config.decoding.max_tokens, 500);
        assert_eq!(config.budget.limit, 12000);
        assert_eq!(config.budget.buffer, 500);
        assert_eq!(config.budget.window, Duration::from_secs(30));
        assert_eq!(config.pacing_delay, Duration::from_secs(5));
        assert_eq!(
            config.api.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("gsk-from-config".to_string())
        );
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_rejects_unparseable_number() {
        let provider = MemoryConfigProvider::new().value(keys::CHUNK_SIZE, "many");
        let err = DispatchConfig::load(&provider).await.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == keys::CHUNK_SIZE));
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let config = DispatchConfig {
            chunk_size_words: 0,
            budget: BudgetSettings {
                limit: 500,
                buffer: 500,
                window: Duration::ZERO,
            },
            ..Default::default()
        };

        match config.validate().unwrap_err() {
            ConfigError::ValidationErrors(errors) => assert_eq!(errors.0.len(), 3),
            other => panic!("Expected validation errors, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_chunk_cost_against_window() {
        let config = DispatchConfig {
            chunk_size_words: 5200,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("5700"));
    }
}
