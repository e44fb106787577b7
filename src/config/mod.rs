//! Pluggable configuration provider system.
//!
//! ```rust,no_run
//! use docqa::config::{ConfigBuilder, DispatchConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ConfigBuilder::new()
//!     .env()
//!     .file("docqa.json")
//!     .build();
//! let config = DispatchConfig::load(&provider).await?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod composite;
pub mod env;
pub mod file;
pub mod memory;
pub mod provider;
pub mod settings;

pub use composite::CompositeConfigProvider;
pub use env::EnvConfigProvider;
pub use file::FileConfigProvider;
pub use memory::MemoryConfigProvider;
pub use provider::{ConfigProvider, ConfigProviderExt};
pub use settings::{ApiSettings, BudgetSettings, DispatchConfig, SummarySettings, keys};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("{0}")]
    ValidationErrors(ValidationErrors),
}

#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ConfigError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Validation failed: ")?;
        let msgs: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", msgs.join("; "))
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Stacks providers by priority: the first one added wins.
#[derive(Default)]
pub struct ConfigBuilder {
    providers: Vec<Box<dyn ConfigProvider>>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Environment variables with the `DOCQA_` prefix.
    pub fn env(mut self) -> Self {
        self.providers.push(Box::new(EnvConfigProvider::new()));
        self
    }

    pub fn env_with_prefix(mut self, prefix: &str) -> Self {
        self.providers
            .push(Box::new(EnvConfigProvider::prefixed(prefix)));
        self
    }

    pub fn file(mut self, path: impl AsRef<std::path::Path>) -> Self {
        self.providers
            .push(Box::new(FileConfigProvider::new(path.as_ref())));
        self
    }

    pub fn memory(mut self, provider: MemoryConfigProvider) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn provider(mut self, provider: Box<dyn ConfigProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn build(self) -> CompositeConfigProvider {
        let mut composite = CompositeConfigProvider::new();
        for provider in self.providers {
            composite.add_provider(provider);
        }
        composite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound {
            key: "api.key".to_string(),
        };
        assert!(err.to_string().contains("api.key"));
    }

    #[test]
    fn test_validation_errors_display() {
        let err = ConfigError::ValidationErrors(ValidationErrors(vec![
            ConfigError::InvalidValue {
                key: "chunk.size".into(),
                message: "must be at least 1 word".into(),
            },
            ConfigError::InvalidValue {
                key: "budget.buffer".into(),
                message: "too large".into(),
            },
        ]));
        assert_eq!(
            err.to_string(),
            "Validation failed: Invalid value for chunk.size: must be at least 1 word; \
             Invalid value for budget.buffer: too large"
        );
    }

    #[tokio::test]
    async fn test_builder_priority() {
        let provider = ConfigBuilder::new()
            .memory(MemoryConfigProvider::named("cli").value("chunk.size", 700))
            .env_with_prefix("DOCQA_BUILDER_TEST_")
            .build();

        assert_eq!(provider.provider_names(), vec!["cli", "env"]);
        let config = DispatchConfig::load(&provider).await.unwrap();
        assert_eq!(config.chunk_size_words, 700);
    }
}
