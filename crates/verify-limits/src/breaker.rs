use dashmap::DashMap;
use std::time::{Duration, Instant};

struct BreakerEntry {
    failure_count: u32,
    open_until: Option<Instant>,
    recent_failures: Vec<Instant>,
}

impl Default for BreakerEntry {
    fn default() -> Self {
        Self {
            failure_count: 0,
            open_until: None,
            recent_failures: Vec::new(),
        }
    }
}

/// Per-domain circuit breaker. `DashMap` gives us the "shard by domain
/// hash" concurrency model the design allows for free: each domain's entry
/// is independently lock-protected, and every operation here is O(1).
pub struct Breaker {
    state: DashMap<String, BreakerEntry>,
    threshold: u32,
    cooldown: Duration,
}

impl Breaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: DashMap::new(),
            threshold,
            cooldown,
        }
    }

    pub fn is_open(&self, domain: &str) -> bool {
        let mut entry = self.state.entry(domain.to_string()).or_default();
        match entry.open_until {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                entry.open_until = None;
                entry.failure_count = 0;
                entry.recent_failures.clear();
                false
            }
            None => false,
        }
    }

    pub fn record_failure(&self, domain: &str) {
        let mut entry = self.state.entry(domain.to_string()).or_default();
        let now = Instant::now();
        entry.failure_count += 1;
        entry.recent_failures.push(now);
        let cutoff = now - Duration::from_secs(60);
        entry.recent_failures.retain(|&ts| ts > cutoff);

        if entry.failure_count >= self.threshold {
            entry.open_until = Some(now + self.cooldown);
        }
    }

    pub fn record_success(&self, domain: &str) {
        let mut entry = self.state.entry(domain.to_string()).or_default();
        entry.failure_count = 0;
        entry.recent_failures.clear();
    }

    pub fn time_until_retry(&self, domain: &str) -> u64 {
        match self.state.get(domain).and_then(|e| e.open_until) {
            Some(until) => {
                let remaining = until.saturating_duration_since(Instant::now());
                remaining.as_secs() + 1
            }
            None => 0,
        }
    }
}
