//! In-memory configuration, for tests and code-defined settings.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::ConfigResult;
use super::provider::ConfigProvider;

#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    data: RwLock<HashMap<String, String>>,
    name: String,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::named("memory")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            name: name.into(),
        }
    }

    /// Builder-style insert used while constructing the provider.
    pub fn value(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.data.get_mut().insert(key.into(), value.to_string());
        self
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl ToString) {
        self.data.write().await.insert(key.into(), value.to_string());
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ConfigProvider for MemoryConfigProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn list_keys(&self, prefix: &str) -> ConfigResult<Vec<String>> {
        Ok(self
            .data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::provider::ConfigProviderExt;

    #[tokio::test]
    async fn test_memory_provider_values() {
        let provider = MemoryConfigProvider::new()
            .value("chunk.size", 1500)
            .value("model", "llama-3.1-8b-instant");

        assert_eq!(provider.len().await, 2);
        assert_eq!(
            provider.get_raw("model").await.unwrap(),
            Some("llama-3.1-8b-instant".to_string())
        );
        assert_eq!(provider.get_raw("missing").await.unwrap(), None);

        let size: Option<usize> = provider.get("chunk.size").await.unwrap();
        assert_eq!(size, Some(1500));
    }

    #[tokio::test]
    async fn test_memory_provider_insert_and_list() {
        let provider = MemoryConfigProvider::new();
        assert!(provider.is_empty().await);

        provider.insert("budget.limit", 6000).await;
        provider.insert("budget.buffer", 500).await;
        provider.insert("pacing.delay_ms", 2000).await;

        let mut keys = provider.list_keys("budget.").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["budget.buffer", "budget.limit"]);
    }

    #[tokio::test]
    async fn test_typed_get_reports_key() {
        let provider = MemoryConfigProvider::new().value("budget.limit", "lots");
        let err = provider.get::<u64>("budget.limit").await.unwrap_err();
        assert!(err.to_string().contains("budget.limit"));
    }
}
