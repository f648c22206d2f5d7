use crate::kv::{KvError, KvStore};
use std::sync::Arc;
use std::time::Duration;

const BOUNCE_WINDOW: Duration = Duration::from_secs(3_600);
const FALSE_POSITIVE_WINDOW: Duration = Duration::from_secs(604_800);
const DEGRADED_FLAG_TTL: Duration = Duration::from_secs(3_600);
const FALSE_POSITIVE_THRESHOLD: i64 = 10;
const DEGRADED_CAP: u32 = 50;

#[derive(Debug, Clone, Copy)]
pub struct ReputationSnapshot {
    pub bounces: i64,
    pub false_positives: i64,
    pub degraded: bool,
}

impl ReputationSnapshot {
    /// Confidence ceiling this domain's track record allows, independent of
    /// any provider cap computed from the domain name itself.
    pub fn confidence_cap(&self) -> u32 {
        if self.degraded {
            DEGRADED_CAP
        } else if self.bounces > 20 {
            70
        } else if self.bounces > 10 {
            80
        } else {
            100
        }
    }
}

/// Rolling bounce / false-positive counters per domain. Reads fail open: if
/// the store is unreachable we assume a clean history rather than refusing
/// to verify, since reputation is an advisory signal, not a gate.
pub struct ReputationTracker {
    kv: Arc<dyn KvStore>,
}

impl ReputationTracker {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn bounce_key(domain: &str) -> String {
        format!("reputation:bounces:{domain}")
    }

    fn false_positive_key(domain: &str) -> String {
        format!("reputation:fp:{domain}")
    }

    fn degraded_key(domain: &str) -> String {
        format!("reputation:degraded:{domain}")
    }

    pub async fn record_bounce(&self, domain: &str) -> Result<(), KvError> {
        let key = Self::bounce_key(domain);
        let count = self.kv.incr(&key).await?;
        if count == 1 {
            self.kv.expire(&key, BOUNCE_WINDOW).await?;
        }
        Ok(())
    }

    pub async fn record_false_positive(&self, domain: &str) -> Result<(), KvError> {
        let key = Self::false_positive_key(domain);
        let count = self.kv.incr(&key).await?;
        if count == 1 {
            self.kv.expire(&key, FALSE_POSITIVE_WINDOW).await?;
        }
        if count >= FALSE_POSITIVE_THRESHOLD {
            self.kv
                .set_flag(&Self::degraded_key(domain), "high_false_positive_rate", DEGRADED_FLAG_TTL)
                .await?;
        }
        Ok(())
    }

    pub async fn snapshot(&self, domain: &str) -> ReputationSnapshot {
        let bounces = self.kv.get(&Self::bounce_key(domain)).await.ok().flatten().unwrap_or(0);
        let false_positives = self
            .kv
            .get(&Self::false_positive_key(domain))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        let degraded = self.kv.exists(&Self::degraded_key(domain)).await.unwrap_or(false);
        ReputationSnapshot {
            bounces,
            false_positives,
            degraded,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kv::InMemoryKvStore;

    #[tokio::test]
    async fn clean_domain_has_full_cap() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = ReputationTracker::new(kv);
        let snap = tracker.snapshot("clean.test").await;
        assert_eq!(snap.confidence_cap(), 100);
        assert!(!snap.degraded);
    }

    #[tokio::test]
    async fn bounce_is_counted() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = ReputationTracker::new(kv);
        tracker.record_bounce("example.test").await.unwrap();
        tracker.record_bounce("example.test").await.unwrap();
        let snap = tracker.snapshot("example.test").await;
        assert_eq!(snap.bounces, 2);
    }

    #[tokio::test]
    async fn false_positive_threshold_degrades_domain() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = ReputationTracker::new(kv);
        for _ in 0..FALSE_POSITIVE_THRESHOLD {
            tracker.record_false_positive("flaky.test").await.unwrap();
        }
        let snap = tracker.snapshot("flaky.test").await;
        assert!(snap.degraded);
        assert_eq!(snap.confidence_cap(), DEGRADED_CAP);
    }

    #[tokio::test]
    async fn below_threshold_stays_clean() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let tracker = ReputationTracker::new(kv);
        for _ in 0..FALSE_POSITIVE_THRESHOLD - 1 {
            tracker.record_false_positive("almost.test").await.unwrap();
        }
        let snap = tracker.snapshot("almost.test").await;
        assert!(!snap.degraded);
    }
}
