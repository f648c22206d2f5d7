pub mod breaker;
pub mod ip_health;
pub mod kv;
pub mod quota;
pub mod redis_store;
pub mod reputation;

pub use breaker::Breaker;
pub use ip_health::{IpHealth, IpHealthMonitor, IpPool, IpPoolError};
pub use kv::{InMemoryKvStore, KvError, KvStore};
pub use quota::{QuotaError, QuotaGuard, Tier};
pub use redis_store::RedisKvStore;
pub use reputation::{ReputationSnapshot, ReputationTracker};
