use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KeyValue;

/// In-process store for tests and `REDIS_URL=memory://` runs. Contents are
/// lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValue for MemoryKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn get_many(&self, keys: &[&str]) -> anyhow::Result<Vec<Option<String>>> {
        let entries = self.entries.lock().await;
        Ok(keys.iter().map(|key| entries.get(*key).cloned()).collect())
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn swap_many(
        &self,
        keys: &[&str],
        value: &str,
    ) -> anyhow::Result<Vec<Option<String>>> {
        let mut entries = self.entries.lock().await;
        Ok(keys
            .iter()
            .map(|key| entries.insert(key.to_string(), value.to_string()))
            .collect())
    }
}
