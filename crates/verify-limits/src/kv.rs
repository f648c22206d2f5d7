use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("key/value store unavailable: {0}")]
    Unavailable(String),
}

/// The shared counter/flag store that Quota, Reputation and IP Health are
/// built on. Kept as a small async trait so a Redis-backed deployment and
/// an in-process test double are interchangeable.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically increment `key` by 1 and return the new value.
    async fn incr(&self, key: &str) -> Result<i64, KvError>;
    /// Set a TTL on `key`. Called once, right after the increment that took
    /// the counter from 0 to 1.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError>;
    async fn get(&self, key: &str) -> Result<Option<i64>, KvError>;
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError>;
    async fn set_flag(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;
    async fn get_flag(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn exists(&self, key: &str) -> Result<bool, KvError>;
}

struct Entry {
    counter: i64,
    flag: Option<String>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self) -> bool {
        match self.expires_at {
            Some(exp) => Instant::now() < exp,
            None => true,
        }
    }
}

/// In-process store used by tests and by deployments without a Redis
/// instance. Semantics (increment-then-expire, lazy expiry on read) mirror
/// the Redis-backed implementation exactly.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn incr(&self, key: &str) -> Result<i64, KvError> {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            counter: 0,
            flag: None,
            expires_at: None,
        });
        if !entry.is_live() {
            entry.counter = 0;
            entry.expires_at = None;
        }
        entry.counter += 1;
        Ok(entry.counter)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), KvError> {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, KvError> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live() => Ok(Some(entry.counter)),
            _ => Ok(None),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, KvError> {
        match self.entries.get(key) {
            Some(entry) => Ok(entry
                .expires_at
                .map(|exp| exp.saturating_duration_since(Instant::now()))),
            None => Ok(None),
        }
    }

    async fn set_flag(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                counter: 0,
                flag: Some(value.to_string()),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn get_flag(&self, key: &str) -> Result<Option<String>, KvError> {
        match self.entries.get(key) {
            Some(entry) if entry.is_live() => Ok(entry.flag.clone()),
            _ => Ok(None),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.get_flag(key).await?.is_some() || self.get(key).await?.is_some())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn incr_sets_ttl_once_on_first_increment() {
        let kv = InMemoryKvStore::new();
        let n = kv.incr("quota:cust:a:example.com").await.unwrap();
        assert_eq!(n, 1);
        kv.expire("quota:cust:a:example.com", Duration::from_secs(3600))
            .await
            .unwrap();
        let ttl = kv.ttl("quota:cust:a:example.com").await.unwrap();
        assert!(ttl.unwrap() <= Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn counter_resets_after_expiry() {
        let kv = InMemoryKvStore::new();
        kv.incr("k").await.unwrap();
        kv.expire("k", Duration::from_millis(10)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        let n = kv.incr("k").await.unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn flag_round_trips() {
        let kv = InMemoryKvStore::new();
        assert!(!kv.exists("reputation:degraded:x").await.unwrap());
        kv.set_flag("reputation:degraded:x", "high_false_positive_rate", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(kv.exists("reputation:degraded:x").await.unwrap());
        assert_eq!(
            kv.get_flag("reputation:degraded:x").await.unwrap(),
            Some("high_false_positive_rate".to_string())
        );
    }
}
