//! MX/SPF/DMARC resolution and the DNS-derived reputation sub-score.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioResolver;
use lruttl::LruCacheWithTtl;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const MX_CACHE_CAPACITY: usize = 50_000;
pub const MX_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("resolver construction failed: {0}")]
    Init(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxHost {
    pub priority: u16,
    pub host: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxRecords {
    pub hosts: Vec<MxHost>,
}

impl MxRecords {
    pub fn primary(&self) -> Option<&str> {
        self.hosts.first().map(|h| h.host.as_str())
    }

    pub fn present(&self) -> bool {
        !self.hosts.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SpfRecord {
    pub present: bool,
    pub strict: bool,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmarcRecord {
    pub present: bool,
    pub text: Option<String>,
}

/// DNS signal resolver: MX cache is in-process, bounded, TTL-expiring;
/// SPF/DMARC lookups are not cached at this layer (they are cheap, single
/// TXT queries and the probe engine calls them at most once per address).
pub struct DnsSignals {
    resolver: TokioResolver,
    lifetime: Duration,
    mx_cache: LruCacheWithTtl<String, Arc<MxRecords>>,
}

impl DnsSignals {
    pub fn new(timeout: Duration, lifetime: Duration) -> Result<Self, DnsError> {
        Self::with_config(ResolverConfig::default(), timeout, lifetime)
    }

    pub fn with_config(
        config: ResolverConfig,
        timeout: Duration,
        lifetime: Duration,
    ) -> Result<Self, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 2;
        let resolver = TokioResolver::builder_with_config(config, Default::default())
            .with_options(opts)
            .build();
        Ok(Self {
            resolver,
            lifetime,
            mx_cache: LruCacheWithTtl::new_named("mx", MX_CACHE_CAPACITY),
        })
    }

    /// Resolve MX records for `domain`, ascending by preference, hosts at the
    /// same preference sorted alphabetically. Failures (NXDOMAIN, timeout)
    /// yield an empty result and are not negatively cached.
    pub async fn mx(&self, domain: &str) -> MxRecords {
        if let Some(cached) = self.mx_cache.get(domain) {
            return (*cached).clone();
        }

        let records = match tokio::time::timeout(self.lifetime, self.resolver.mx_lookup(domain)).await {
            Ok(Ok(lookup)) => {
                let mut hosts: Vec<MxHost> = lookup
                    .iter()
                    .map(|mx| MxHost {
                        priority: mx.preference(),
                        host: mx.exchange().to_string().trim_end_matches('.').to_lowercase(),
                    })
                    .collect();
                hosts.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.host.cmp(&b.host)));
                MxRecords { hosts }
            }
            Ok(Err(err)) => {
                tracing::debug!(domain, error = %err, "MX lookup failed");
                MxRecords::default()
            }
            Err(_) => {
                tracing::debug!(domain, "MX lookup exceeded DNS lifetime");
                MxRecords::default()
            }
        };

        if records.present() {
            self.mx_cache.insert(
                domain.to_string(),
                Arc::new(records.clone()),
                std::time::Instant::now() + MX_CACHE_TTL,
            );
        }
        records
    }

    pub async fn spf(&self, domain: &str) -> SpfRecord {
        for text in self.txt_records(domain).await {
            if text.contains("v=spf1") {
                return SpfRecord {
                    present: true,
                    strict: text.contains("-all"),
                    text: Some(text),
                };
            }
        }
        SpfRecord::default()
    }

    pub async fn dmarc(&self, domain: &str) -> DmarcRecord {
        let query = format!("_dmarc.{domain}");
        if let Some(text) = self.txt_records(&query).await.into_iter().next() {
            return DmarcRecord {
                present: true,
                text: Some(text),
            };
        }
        DmarcRecord::default()
    }

    async fn txt_records(&self, name: &str) -> Vec<String> {
        match tokio::time::timeout(self.lifetime, self.resolver.txt_lookup(name)).await {
            Ok(Ok(lookup)) => lookup
                .iter()
                .map(|txt| {
                    txt.iter()
                        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                        .collect::<String>()
                })
                .collect(),
            Ok(Err(err)) => {
                tracing::debug!(name, error = %err, "TXT lookup failed");
                Vec::new()
            }
            Err(_) => {
                tracing::debug!(name, "TXT lookup exceeded DNS lifetime");
                Vec::new()
            }
        }
    }
}

/// §4.2: starts at 50, +15 SPF present, +10 SPF strict, +15 DMARC present,
/// +10 MX present with more than one host, capped at 100.
pub fn reputation_score(spf: &SpfRecord, dmarc: &DmarcRecord, mx: &MxRecords) -> u32 {
    let mut score = 50;
    if spf.present {
        score += 15;
    }
    if spf.strict {
        score += 10;
    }
    if dmarc.present {
        score += 15;
    }
    if mx.present() && mx.hosts.len() > 1 {
        score += 10;
    }
    score.min(100)
}
