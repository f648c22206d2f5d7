use crate::fast_path::FastPathClient;
use crate::probe_engine::ProbeEngine;
use crate::types::{Signals, VerifyResult};
use addr_classify::{is_valid_syntax, normalize, split};
use std::sync::Arc;
use std::time::Instant;
use verify_limits::{Breaker, IpHealthMonitor, IpPool, QuotaError, QuotaGuard, ReputationTracker};
use verify_scoring::{score, status_for, ScoringInput};

pub struct Orchestrator {
    pub breaker: Arc<Breaker>,
    pub quota: Arc<QuotaGuard>,
    pub reputation: Arc<ReputationTracker>,
    pub fast_path: Option<Arc<FastPathClient>>,
    pub probe_engine: Arc<ProbeEngine>,
    pub ip_pool: Arc<IpPool>,
    #[allow(dead_code)]
    pub ip_health: Arc<IpHealthMonitor>,
}

impl Orchestrator {
    pub async fn verify_one(
        &self,
        raw_email: &str,
        customer_id: &str,
        use_probe: bool,
        ip_index: Option<usize>,
    ) -> VerifyResult {
        let started = Instant::now();
        let mut result = self
            .verify_one_inner(raw_email, customer_id, use_probe, ip_index)
            .await;
        result.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        result
    }

    async fn verify_one_inner(
        &self,
        raw_email: &str,
        customer_id: &str,
        use_probe: bool,
        ip_index: Option<usize>,
    ) -> VerifyResult {
        let email = normalize(raw_email);
        if !is_valid_syntax(&email) {
            return VerifyResult::bad_syntax(&email);
        }
        let (local, domain) = match split(&email) {
            Some((local, domain)) => (local.to_string(), domain.to_string()),
            None => return VerifyResult::bad_syntax(&email),
        };

        if self.breaker.is_open(&domain) {
            let retry_after = self.breaker.time_until_retry(&domain);
            return VerifyResult::circuit_breaker_open(&email, retry_after);
        }

        if let Err(err) = self.quota.check(customer_id, &domain).await {
            let retry_after = match err {
                QuotaError::Exceeded { reset_in } => reset_in,
                QuotaError::Unavailable => None,
            };
            return VerifyResult::quota_exceeded(&email, retry_after);
        }

        if let Some(fast_path) = &self.fast_path {
            match fast_path.verify(&email).await {
                Ok(outcome) if !outcome.catch_all && outcome.is_valid => {
                    self.breaker.record_success(&domain);
                    return VerifyResult::fast_path_valid(&email);
                }
                Ok(outcome) if !outcome.catch_all => {
                    self.breaker.record_success(&domain);
                    return VerifyResult::fast_path_invalid(&email);
                }
                Ok(_) => {
                    // catch-all reported; fall through to probing.
                }
                Err(_) => {
                    self.breaker.record_failure(&domain);
                }
            }
        }

        if !use_probe {
            return VerifyResult::probe_skipped(&email);
        }

        if !self.ip_pool.is_empty() && self.ip_pool.select(&domain, ip_index).await.is_err() {
            return VerifyResult::ip_pool_exhausted(&email);
        }

        match self.probe_engine.probe(&local, &domain).await {
            Ok(signals) => {
                self.breaker.record_success(&domain);
                self.score_signals(&email, &domain, signals).await
            }
            Err(_) => {
                self.breaker.record_failure(&domain);
                VerifyResult::probe_engine_error(&email)
            }
        }
    }

    async fn score_signals(&self, email: &str, domain: &str, signals: Signals) -> VerifyResult {
        let input = ScoringInput {
            fake_rejected: signals.fake_rejected,
            queue_id_detected: signals.queue_id.detected,
            timing_ratio: signals.timing_ratio.ratio,
            spf_strict: signals.spf.strict,
        };
        let reputation_cap = self.reputation.snapshot(domain).await.confidence_cap();
        let confidence = score(&input, domain, reputation_cap);
        let status = status_for(confidence);
        let catch_all = signals.fake_rejected != Some(true);
        VerifyResult::from_probe(email, confidence, status, catch_all, signals)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::probe_engine::ProbeConfig;
    use crate::types::Status;
    use dns_signals::DnsSignals;
    use std::time::Duration;
    use verify_limits::{InMemoryKvStore, KvStore, Tier};

    fn test_orchestrator() -> Orchestrator {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let dns = DnsSignals::new(Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        let probe_engine = Arc::new(ProbeEngine::new(
            dns,
            ProbeConfig {
                smtp_timeout: Duration::from_millis(50),
                helo_domain: "verify.test".to_string(),
                mail_from: "probe@verify.test".to_string(),
                probe_pause: Duration::from_millis(1),
            },
        ));
        Orchestrator {
            breaker: Arc::new(Breaker::new(3, Duration::from_secs(300))),
            quota: Arc::new(QuotaGuard::new(kv.clone(), Tier::STANDARD)),
            reputation: Arc::new(ReputationTracker::new(kv.clone())),
            fast_path: None,
            probe_engine,
            ip_pool: Arc::new(IpPool::new(vec![], None)),
            ip_health: Arc::new(IpHealthMonitor::new(kv)),
        }
    }

    #[tokio::test]
    async fn bad_syntax_short_circuits_before_any_gate() {
        let orchestrator = test_orchestrator();
        let result = orchestrator.verify_one("not-an-email", "cust-a", true, None).await;
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.reason, "bad_syntax");
    }

    #[tokio::test]
    async fn breaker_open_short_circuits_without_probing() {
        let orchestrator = test_orchestrator();
        orchestrator.breaker.record_failure("example.test");
        orchestrator.breaker.record_failure("example.test");
        orchestrator.breaker.record_failure("example.test");

        let result = orchestrator.verify_one("x@example.test", "cust-a", true, None).await;
        assert_eq!(result.status, Status::Risky);
        assert_eq!(result.confidence, 0);
        assert_eq!(result.reason, "circuit_breaker_open");
        assert!(result.retry_after.unwrap() <= 300);
    }

    #[tokio::test]
    async fn quota_exceeded_short_circuits_before_probing() {
        let orchestrator = test_orchestrator();
        // drain the per-customer budget for this domain.
        for _ in 0..500 {
            orchestrator.quota.check("cust-a", "quota.test").await.unwrap();
        }
        let result = orchestrator.verify_one("x@quota.test", "cust-a", true, None).await;
        assert_eq!(result.status, Status::Risky);
        assert_eq!(result.reason, "quota_exceeded");
    }
}
