use crate::kv::{KvError, KvStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Redis-backed `KvStore`. Uses redis's own `ConnectionManager`, which
/// reconnects transparently, so a single clone-cheap handle can be shared
/// across the worker pool without a separate pooling layer.
pub struct RedisKvStore {
    manager: ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(host: &str, port: u16, db: i64) -> Result<Self, KvError> {
        let url = format!("redis://{host}:{port}/{db}");
        let client = redis::Client::open(url).map_err(|err| KvError::Unavailable(err.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut conn = self.manager.clone();
        conn.incr(key, 1)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .expire(key, ttl.as_secs() as i64)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, KvError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        let mut conn = self.manager.clone();
        let secs: i64 = conn
            .ttl(key)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(if secs > 0 {
            Some(Duration::from_secs(secs as u64))
        } else {
            None
        })
    }

    async fn set_flag(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        let mut conn = self.manager.clone();
        let n: i64 = conn
            .exists(key)
            .await
            .map_err(|err| KvError::Unavailable(err.to_string()))?;
        Ok(n > 0)
    }
}
