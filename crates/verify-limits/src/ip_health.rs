use crate::kv::{KvError, KvStore};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const BOUNCE_WINDOW: Duration = Duration::from_secs(3600);
const BOUNCE_BLOCK_THRESHOLD: i64 = 5;
const BLOCK_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone)]
pub struct IpHealth {
    pub ip: String,
    pub domain: String,
    pub bounces: i64,
    pub blocked: bool,
    pub health_score: i64,
}

/// Tracks bounce/blacklist history per (sending ip, recipient domain) pair
/// and feeds a round-robin pool selector that skips blocked addresses.
pub struct IpHealthMonitor {
    kv: Arc<dyn KvStore>,
}

impl IpHealthMonitor {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    fn bounce_key(ip: &str, domain: &str) -> String {
        format!("ip:bounces:{ip}:{domain}")
    }

    fn block_key(ip: &str, domain: &str) -> String {
        format!("ip:blocked:{ip}:{domain}")
    }

    pub async fn mark_bounce(&self, ip: &str, domain: &str) -> Result<(), KvError> {
        let key = Self::bounce_key(ip, domain);
        let count = self.kv.incr(&key).await?;
        if count == 1 {
            self.kv.expire(&key, BOUNCE_WINDOW).await?;
        }
        if count >= BOUNCE_BLOCK_THRESHOLD {
            self.block(ip, domain, "too_many_bounces").await?;
        }
        Ok(())
    }

    pub async fn mark_blacklist(&self, ip: &str, domain: &str) -> Result<(), KvError> {
        self.block(ip, domain, "blacklist").await
    }

    pub async fn block(&self, ip: &str, domain: &str, reason: &str) -> Result<(), KvError> {
        self.kv.set_flag(&Self::block_key(ip, domain), reason, BLOCK_TTL).await
    }

    pub async fn is_blocked(&self, ip: &str, domain: &str) -> bool {
        self.kv.exists(&Self::block_key(ip, domain)).await.unwrap_or(false)
    }

    pub async fn health(&self, ip: &str, domain: &str) -> IpHealth {
        let bounces = self
            .kv
            .get(&Self::bounce_key(ip, domain))
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        let blocked = self.is_blocked(ip, domain).await;
        IpHealth {
            ip: ip.to_string(),
            domain: domain.to_string(),
            bounces,
            blocked,
            health_score: (100 - bounces * 15).max(0),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IpPoolError {
    #[error("ip pool exhausted")]
    Exhausted,
}

/// Round-robin selector over a fixed set of sending IPs. An empty pool is
/// the common case (no dedicated IP pool configured) and simply disables
/// IP health tracking for the caller, rather than being treated as an error.
pub struct IpPool {
    ips: Vec<String>,
    cursor: AtomicUsize,
    monitor: Mutex<Option<Arc<IpHealthMonitor>>>,
}

impl IpPool {
    pub fn new(ips: Vec<String>, monitor: Option<Arc<IpHealthMonitor>>) -> Self {
        Self {
            ips,
            cursor: AtomicUsize::new(0),
            monitor: Mutex::new(monitor),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }

    /// Select a healthy IP for `domain`. `start` pins the first candidate
    /// (the request's `ip_index`, when supplied); absent a hint, the pool's
    /// own atomic cursor advances round-robin across calls.
    pub async fn select(&self, domain: &str, start: Option<usize>) -> Result<Option<String>, IpPoolError> {
        if self.ips.is_empty() {
            return Ok(None);
        }
        let monitor = self.monitor.lock().clone();
        let len = self.ips.len();
        let base = start.unwrap_or_else(|| self.cursor.load(Ordering::Relaxed));
        for step in 0..len {
            let idx = (base + step) % len;
            if start.is_none() {
                self.cursor.fetch_add(1, Ordering::Relaxed);
            }
            let candidate = &self.ips[idx];
            let blocked = match &monitor {
                Some(m) => m.is_blocked(candidate, domain).await,
                None => false,
            };
            if !blocked {
                return Ok(Some(candidate.clone()));
            }
        }
        Err(IpPoolError::Exhausted)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kv::InMemoryKvStore;

    #[tokio::test]
    async fn bounce_threshold_blocks_ip() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let monitor = IpHealthMonitor::new(kv);
        for _ in 0..BOUNCE_BLOCK_THRESHOLD {
            monitor.mark_bounce("10.0.0.1", "example.test").await.unwrap();
        }
        assert!(monitor.is_blocked("10.0.0.1", "example.test").await);
    }

    #[tokio::test]
    async fn health_score_decreases_with_bounces() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let monitor = IpHealthMonitor::new(kv);
        monitor.mark_bounce("10.0.0.2", "example.test").await.unwrap();
        monitor.mark_bounce("10.0.0.2", "example.test").await.unwrap();
        let health = monitor.health("10.0.0.2", "example.test").await;
        assert_eq!(health.health_score, 70);
    }

    #[tokio::test]
    async fn empty_pool_selects_none_without_error() {
        let pool = IpPool::new(vec![], None);
        assert!(pool.is_empty());
        assert_eq!(pool.select("example.test", None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn pool_skips_blocked_ip() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let monitor = Arc::new(IpHealthMonitor::new(kv));
        monitor.block("10.0.0.1", "example.test", "manual_test_block").await.unwrap();
        let pool = IpPool::new(
            vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()],
            Some(monitor),
        );
        let selected = pool.select("example.test", None).await.unwrap();
        assert_eq!(selected, Some("10.0.0.2".to_string()));
    }

    #[tokio::test]
    async fn pool_exhausted_when_all_blocked() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let monitor = Arc::new(IpHealthMonitor::new(kv));
        monitor.block("10.0.0.1", "example.test", "manual_test_block").await.unwrap();
        let pool = IpPool::new(vec!["10.0.0.1".to_string()], Some(monitor));
        assert!(matches!(pool.select("example.test", None).await, Err(IpPoolError::Exhausted)));
    }
}
