//! Environment variable configuration provider.
//!
//! `chunk.size` is read from `DOCQA_CHUNK_SIZE` with the default prefix.

use super::provider::ConfigProvider;
use super::{ConfigError, ConfigResult};

pub const DEFAULT_ENV_PREFIX: &str = "DOCQA_";

#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    prefix: String,
}

impl EnvConfigProvider {
    pub fn new() -> Self {
        Self::prefixed(DEFAULT_ENV_PREFIX)
    }

    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn env_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_uppercase().replace('.', "_"))
    }

    fn key_from_env(&self, env_name: &str) -> Option<String> {
        env_name
            .strip_prefix(&self.prefix)
            .map(|rest| rest.to_lowercase().replace('_', "."))
    }
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for EnvConfigProvider {
    fn name(&self) -> &str {
        "env"
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        match std::env::var(self.env_key(key)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::Env(e)),
        }
    }

    // Underscores inside a key segment (`max_tokens`) cannot be told apart
    // from separators, so listed keys are approximate.
    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        let env_prefix = self.env_key(prefix);
        Ok(std::env::vars()
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .filter_map(|(k, _)| self.key_from_env(&k))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_conversion() {
        let provider = EnvConfigProvider::new();
        assert_eq!(provider.env_key("chunk.size"), "DOCQA_CHUNK_SIZE");
        assert_eq!(provider.env_key("budget.limit"), "DOCQA_BUDGET_LIMIT");

        let provider = EnvConfigProvider::prefixed("QA_");
        assert_eq!(provider.env_key("pacing.delay_ms"), "QA_PACING_DELAY_MS");
        assert_eq!(
            provider.key_from_env("QA_BUDGET_LIMIT"),
            Some("budget.limit".to_string())
        );
        assert_eq!(provider.key_from_env("OTHER_BUDGET_LIMIT"), None);
    }

    #[tokio::test]
    async fn test_env_provider_get() {
        let provider = EnvConfigProvider::prefixed("DOCQA_TEST_ENV_");

        // SAFETY: Test-only environment setup with a key no other test uses
        unsafe { std::env::set_var("DOCQA_TEST_ENV_CHUNK_SIZE", "900") };
        let value = provider.get_raw("chunk.size").await.unwrap();
        assert_eq!(value, Some("900".to_string()));

        let keys = provider.list_keys("chunk").await.unwrap();
        assert_eq!(keys, vec!["chunk.size".to_string()]);
        unsafe { std::env::remove_var("DOCQA_TEST_ENV_CHUNK_SIZE") };
    }

    #[tokio::test]
    async fn test_env_provider_not_found() {
        let provider = EnvConfigProvider::prefixed("NONEXISTENT_PREFIX_");
        assert_eq!(provider.get_raw("budget.limit").await.unwrap(), None);
    }
}
