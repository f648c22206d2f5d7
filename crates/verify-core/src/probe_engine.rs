use crate::types::Signals;
use dns_signals::DnsSignals;
use rand::distributions::Alphanumeric;
use rand::Rng;
use smtp_probe::{ClientError, SmtpClient, SmtpTimeouts};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use verify_scoring::{banner, queue_id, timing};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no mx records for domain")]
    NoMx,
    #[error("smtp error: {0}")]
    Smtp(#[from] ClientError),
}

pub struct ProbeConfig {
    pub smtp_timeout: Duration,
    pub helo_domain: String,
    pub mail_from: String,
    pub probe_pause: Duration,
}

/// Runs one SMTP session against a domain's primary MX and produces the
/// multi-signal fingerprint the scorer consumes. A single connection is
/// reused across the real probe and both fake probes by design: the timing
/// differential only means something when measured on the same session.
pub struct ProbeEngine {
    dns: DnsSignals,
    config: ProbeConfig,
}

impl ProbeEngine {
    pub fn new(dns: DnsSignals, config: ProbeConfig) -> Self {
        Self { dns, config }
    }

    pub async fn probe(&self, local: &str, domain: &str) -> Result<Signals, ProbeError> {
        let mx = self.dns.mx(domain).await;
        let primary = mx.primary().ok_or(ProbeError::NoMx)?;

        let addr = resolve_smtp_addr(primary).await;
        let timeouts = SmtpTimeouts::uniform(self.config.smtp_timeout);
        let mut client = SmtpClient::connect(addr, timeouts).await?;

        let banner_resp = client.read_banner().await?;
        let mta = banner::parse(&banner_resp.message);

        client.ehlo(&self.config.helo_domain).await?;
        client.mail_from(&self.config.mail_from).await?;

        let real_addr = format!("{local}@{domain}");
        let real_started = Instant::now();
        let real_resp = client.rcpt_to(&real_addr).await?;
        let real_elapsed = real_started.elapsed().as_secs_f64() * 1000.0;

        client.rset().await?;
        client.mail_from(&self.config.mail_from).await?;
        tokio::time::sleep(self.config.probe_pause).await;

        let fake1_local = random_local();
        let fake1_addr = format!("{fake1_local}@{domain}");
        let fake1_started = Instant::now();
        let fake1_resp = client.rcpt_to(&fake1_addr).await?;
        let fake1_elapsed = fake1_started.elapsed().as_secs_f64() * 1000.0;
        let fake_rejected = fake1_resp.code != 250;

        client.rset().await?;
        client.mail_from(&self.config.mail_from).await?;
        tokio::time::sleep(self.config.probe_pause).await;

        let fake2_local = random_local();
        let fake2_addr = format!("{fake2_local}@{domain}");
        let fake2_started = Instant::now();
        let fake2_resp = client.rcpt_to(&fake2_addr).await?;
        let fake2_elapsed = fake2_started.elapsed().as_secs_f64() * 1000.0;

        let _ = client.quit().await;

        let fake_times_ms = vec![fake1_elapsed, fake2_elapsed];
        let fake_codes = vec![fake1_resp.code, fake2_resp.code];
        let spf = self.dns.spf(domain).await;

        Ok(Signals {
            fake_rejected: Some(fake_rejected),
            queue_id: queue_id::detect(&real_resp.message),
            timing_ratio: timing::analyze(real_elapsed, &fake_times_ms),
            spf,
            mta,
            real_code: real_resp.code,
            fake_codes,
            real_time_ms: real_elapsed,
            fake_times_ms,
        })
    }
}

fn random_local() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(12)
        .map(char::from)
        .collect()
}

async fn resolve_smtp_addr(host: &str) -> SocketAddr {
    use tokio::net::lookup_host;
    let target = format!("{host}:25");
    let result = match lookup_host(&target).await {
        Ok(mut addrs) => addrs.next().unwrap_or_else(|| fallback_addr()),
        Err(_) => fallback_addr(),
    };
    result
}

fn fallback_addr() -> SocketAddr {
    "0.0.0.0:25".parse().expect("static socket addr parses")
}
