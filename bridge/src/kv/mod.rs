pub mod memory;
pub mod redis_kv;

use async_trait::async_trait;

/// Flat string key-value store backing the LED mailbox.
/// Single-key operations must be atomic; `swap_many` is the only multi-key
/// operation and must be atomic as a whole.
#[async_trait]
pub trait KeyValue: Send + Sync + 'static {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn get_many(&self, keys: &[&str]) -> anyhow::Result<Vec<Option<String>>>;
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Writes only when the key is missing; returns whether it wrote.
    async fn set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool>;
    /// Atomically sets every key to `value` and returns the previous values.
    /// Either every key is replaced or none is.
    async fn swap_many(
        &self,
        keys: &[&str],
        value: &str,
    ) -> anyhow::Result<Vec<Option<String>>>;
}
