use anyhow::Context;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::debug;

use super::KeyValue;

/// Redis-backed store. Every key is a plain string value.
pub struct RedisKv {
    conn: MultiplexedConnection,
}

impl RedisKv {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to redis")?;
        Ok(Self::new(conn))
    }
}

#[async_trait]
impl KeyValue for RedisKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.context("redis get failed")?;
        Ok(value)
    }

    async fn get_many(&self, keys: &[&str]) -> anyhow::Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        // `AsyncCommands::get` sends GET for a one-element slice, so MGET is spelled out.
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(keys)
            .query_async(&mut conn)
            .await
            .context("redis mget failed")?;
        Ok(values)
    }

    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .context("redis set failed")?;
        debug!(key = key, value = value, "stored value");
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn.clone();
        let written: bool = conn
            .set_nx(key, value)
            .await
            .context("redis setnx failed")?;
        Ok(written)
    }

    async fn swap_many(
        &self,
        keys: &[&str],
        value: &str,
    ) -> anyhow::Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.atomic();
        for key in keys {
            pipe.getset(*key, value);
        }
        let previous: Vec<Option<String>> = pipe
            .query_async(&mut conn)
            .await
            .context("redis multi getset failed")?;
        Ok(previous)
    }
}
