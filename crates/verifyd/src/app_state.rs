use addr_classify::Classifier;
use dns_signals::DnsSignals;
use std::sync::Arc;
use verify_core::{Config, FastPathClient, Orchestrator, ProbeConfig, ProbeEngine};
use verify_limits::{
    Breaker, InMemoryKvStore, IpHealthMonitor, IpPool, KvStore, QuotaGuard, RedisKvStore,
    ReputationTracker, Tier,
};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub quota: Arc<QuotaGuard>,
    pub reputation: Arc<ReputationTracker>,
    /// Loaded at startup per the free/disposable/role data files; not yet
    /// consulted by the orchestrator's scoring pipeline, only by future
    /// policy gates and direct callers of the classifier API.
    #[allow(dead_code)]
    pub classifier: Arc<Classifier>,
    pub worker_limit: Arc<tokio::sync::Semaphore>,
}

pub async fn build(config: &Config) -> anyhow::Result<AppState> {
    let kv: Arc<dyn KvStore> = match RedisKvStore::connect(&config.redis_host, config.redis_port, config.redis_db).await {
        Ok(store) => {
            tracing::info!(host = %config.redis_host, port = config.redis_port, "connected to redis");
            Arc::new(store)
        }
        Err(err) => {
            tracing::warn!(error = %err, "redis unavailable, falling back to in-process kv store");
            Arc::new(InMemoryKvStore::new())
        }
    };

    let tier = Tier::by_name(&config.quota_tier);
    let quota = Arc::new(QuotaGuard::new(kv.clone(), tier));
    let reputation = Arc::new(ReputationTracker::new(kv.clone()));
    let ip_health = Arc::new(IpHealthMonitor::new(kv.clone()));
    let breaker = Arc::new(Breaker::new(config.breaker_threshold, config.breaker_cooldown));
    let ip_pool = Arc::new(IpPool::new(config.ip_pool.clone(), Some(ip_health.clone())));

    let dns = DnsSignals::new(config.dns_timeout, config.dns_lifetime)?;
    let probe_engine = Arc::new(ProbeEngine::new(
        dns,
        ProbeConfig {
            smtp_timeout: config.smtp_timeout,
            helo_domain: config.helo_domain.clone(),
            mail_from: config.mail_from.clone(),
            probe_pause: config.probe_pause,
        },
    ));

    let fast_path = config.omkar_url.clone().map(|url| {
        Arc::new(FastPathClient::new(
            url,
            config.omkar_api_key.clone(),
            std::time::Duration::from_secs(10),
        ))
    });

    let classifier = Arc::new(Classifier::load(
        &config.free_domains_file,
        &config.disposable_domains_file,
        &config.role_prefixes_file,
    ));

    let orchestrator = Arc::new(Orchestrator {
        breaker,
        quota: quota.clone(),
        reputation: reputation.clone(),
        fast_path,
        probe_engine,
        ip_pool,
        ip_health,
    });

    Ok(AppState {
        orchestrator,
        quota,
        reputation,
        classifier,
        worker_limit: Arc::new(tokio::sync::Semaphore::new(config.max_workers)),
    })
}
