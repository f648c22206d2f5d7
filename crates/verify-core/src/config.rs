use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, loaded once from the environment at startup and
/// handed around as an `Arc`. No component re-reads the environment after
/// this is constructed.
#[derive(Debug, Clone)]
pub struct Config {
    pub omkar_url: Option<String>,
    pub omkar_api_key: String,
    pub dns_timeout: Duration,
    pub dns_lifetime: Duration,
    pub smtp_timeout: Duration,
    pub helo_domain: String,
    pub mail_from: String,
    pub max_workers: usize,
    pub probe_pause: Duration,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_db: i64,
    pub ip_pool: Vec<String>,
    pub listen_addr: String,
    pub log_filter: String,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
    pub quota_tier: String,
    pub free_domains_file: PathBuf,
    pub disposable_domains_file: PathBuf,
    pub role_prefixes_file: PathBuf,
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let ip_pool = std::env::var("IP_POOL")
            .map(|v| v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        Self {
            omkar_url: std::env::var("OMKAR_URL").ok(),
            omkar_api_key: env_string("OMKAR_API_KEY", ""),
            dns_timeout: Duration::from_secs(env_parsed("DNS_TIMEOUT", 5)),
            dns_lifetime: Duration::from_secs(env_parsed("DNS_LIFETIME", 10)),
            smtp_timeout: Duration::from_secs(env_parsed("SMTP_TIMEOUT", 15)),
            helo_domain: env_string("HELO_DOMAIN", "verify.local"),
            mail_from: env_string("MAIL_FROM", "probe@verify.local"),
            max_workers: env_parsed("MAX_WORKERS", 24),
            probe_pause: Duration::from_millis(env_parsed("PROBE_PAUSE", 80)),
            redis_host: env_string("REDIS_HOST", "127.0.0.1"),
            redis_port: env_parsed("REDIS_PORT", 6379),
            redis_db: env_parsed("REDIS_DB", 0),
            ip_pool,
            listen_addr: env_string("LISTEN_ADDR", "0.0.0.0:8080"),
            log_filter: env_string("VERIFYD_LOG", "verifyd=info,verify_core=info"),
            breaker_threshold: env_parsed("BREAKER_THRESHOLD", 3),
            breaker_cooldown: Duration::from_secs(env_parsed("BREAKER_COOLDOWN", 300)),
            quota_tier: env_string("QUOTA_TIER", "default"),
            free_domains_file: PathBuf::from(env_string("FREE_DOMAINS_FILE", "data/free_domains.txt")),
            disposable_domains_file: PathBuf::from(env_string(
                "DISPOSABLE_DOMAINS_FILE",
                "data/disposable_domains.txt",
            )),
            role_prefixes_file: PathBuf::from(env_string("ROLE_PREFIXES_FILE", "data/role_prefixes.txt")),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_load_from_empty_environment() {
        // Exercises the parse-or-default path directly; does not touch
        // process environment to avoid cross-test interference.
        assert_eq!(env_parsed::<u64>("VERIFY_CORE_TEST_UNSET_DURATION", 15), 15);
        assert_eq!(env_string("VERIFY_CORE_TEST_UNSET_STRING", "verify.local"), "verify.local");
    }
}
