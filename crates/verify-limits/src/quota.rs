use crate::kv::{KvError, KvStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const WINDOW: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub per_customer: i64,
    pub global: i64,
}

impl Tier {
    pub const STANDARD: Tier = Tier {
        per_customer: 500,
        global: 5000,
    };
    pub const HIGH: Tier = Tier {
        per_customer: 5000,
        global: 50000,
    };

    pub fn by_name(name: &str) -> Tier {
        match name {
            "high_tier" => Tier::HIGH,
            _ => Tier::STANDARD,
        }
    }
}

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("quota exceeded")]
    Exceeded { reset_in: Option<u64> },
    #[error("quota store unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct QuotaUsage {
    pub customer_used: i64,
    pub customer_limit: i64,
    pub global_used: i64,
    pub global_limit: i64,
    pub customer_reset_in: Option<u64>,
    pub global_reset_in: Option<u64>,
}

/// Dual-scoped (per-customer, global) rolling-hour quota, both scoped to a
/// single recipient domain. Increment-then-test order is intentional: the
/// extra count on the losing check is acceptable slop, atomicity per counter
/// is what matters. Fails closed if the backing store can't be reached.
pub struct QuotaGuard {
    kv: Arc<dyn KvStore>,
    tier: Tier,
}

impl QuotaGuard {
    pub fn new(kv: Arc<dyn KvStore>, tier: Tier) -> Self {
        Self { kv, tier }
    }

    fn customer_key(customer_id: &str, domain: &str) -> String {
        format!("quota:cust:{customer_id}:{domain}")
    }

    fn global_key(domain: &str) -> String {
        format!("quota:global:{domain}")
    }

    pub async fn check(&self, customer_id: &str, domain: &str) -> Result<(), QuotaError> {
        let customer_key = Self::customer_key(customer_id, domain);
        let customer_count = self.incr_and_window(&customer_key).await?;
        if customer_count > self.tier.per_customer {
            let reset_in = self.reset_in(&customer_key).await;
            return Err(QuotaError::Exceeded { reset_in });
        }

        let global_key = Self::global_key(domain);
        let global_count = self.incr_and_window(&global_key).await?;
        if global_count > self.tier.global {
            let reset_in = self.reset_in(&global_key).await;
            return Err(QuotaError::Exceeded { reset_in });
        }

        Ok(())
    }

    async fn incr_and_window(&self, key: &str) -> Result<i64, QuotaError> {
        let count = self
            .kv
            .incr(key)
            .await
            .map_err(|_: KvError| QuotaError::Unavailable)?;
        if count == 1 {
            self.kv
                .expire(key, WINDOW)
                .await
                .map_err(|_: KvError| QuotaError::Unavailable)?;
        }
        Ok(count)
    }

    async fn reset_in(&self, key: &str) -> Option<u64> {
        self.kv.ttl(key).await.ok().flatten().map(|d| d.as_secs())
    }

    /// Read-only usage snapshot; never increments.
    pub async fn usage(&self, customer_id: &str, domain: &str) -> QuotaUsage {
        let customer_key = Self::customer_key(customer_id, domain);
        let global_key = Self::global_key(domain);
        let customer_used = self.kv.get(&customer_key).await.ok().flatten().unwrap_or(0);
        let global_used = self.kv.get(&global_key).await.ok().flatten().unwrap_or(0);
        QuotaUsage {
            customer_used,
            customer_limit: self.tier.per_customer,
            global_used,
            global_limit: self.tier.global,
            customer_reset_in: self.reset_in(&customer_key).await,
            global_reset_in: self.reset_in(&global_key).await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::kv::InMemoryKvStore;

    #[tokio::test]
    async fn usage_tracks_increments() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let guard = QuotaGuard::new(kv, Tier::STANDARD);
        guard.check("cust-a", "example.com").await.unwrap();
        let usage = guard.usage("cust-a", "example.com").await;
        assert_eq!(usage.customer_used, 1);
        assert_eq!(usage.customer_limit, 500);
    }

    #[tokio::test]
    async fn rejects_once_per_customer_limit_hit() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let guard = QuotaGuard::new(
            kv,
            Tier {
                per_customer: 2,
                global: 1000,
            },
        );
        guard.check("cust-a", "example.com").await.unwrap();
        guard.check("cust-a", "example.com").await.unwrap();
        let err = guard.check("cust-a", "example.com").await.unwrap_err();
        assert!(matches!(err, QuotaError::Exceeded { .. }));
    }

    #[tokio::test]
    async fn global_limit_applies_across_customers_for_same_domain() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let guard = QuotaGuard::new(
            kv,
            Tier {
                per_customer: 1000,
                global: 1,
            },
        );
        guard.check("cust-a", "example.com").await.unwrap();
        let err = guard.check("cust-b", "example.com").await.unwrap_err();
        assert!(matches!(err, QuotaError::Exceeded { .. }));
    }

    #[tokio::test]
    async fn different_domains_have_independent_global_counters() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let guard = QuotaGuard::new(
            kv,
            Tier {
                per_customer: 1000,
                global: 1,
            },
        );
        guard.check("cust-a", "example.com").await.unwrap();
        guard.check("cust-a", "other.com").await.unwrap();
    }

    #[tokio::test]
    async fn high_tier_has_larger_budget() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let guard = QuotaGuard::new(kv, Tier::by_name("high_tier"));
        guard.check("cust-a", "example.com").await.unwrap();
        let usage = guard.usage("cust-a", "example.com").await;
        assert_eq!(usage.customer_limit, 5000);
    }
}
