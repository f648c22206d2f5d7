use dns_signals::SpfRecord;
use serde::{Deserialize, Serialize};
use verify_scoring::{MtaInfo, QueueIdResult, TimingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Valid,
    Invalid,
    Risky,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Omkar,
    ProbeEngine,
    System,
    Cache,
}

/// Everything the probe engine learned about one address, fed to the scorer
/// and carried verbatim on the result for callers that want the raw signal
/// breakdown rather than just the fused confidence.
#[derive(Debug, Clone, Serialize)]
pub struct Signals {
    pub fake_rejected: Option<bool>,
    pub queue_id: QueueIdResult,
    pub timing_ratio: TimingResult,
    pub spf: SpfRecord,
    pub mta: MtaInfo,
    pub real_code: u16,
    pub fake_codes: Vec<u16>,
    pub real_time_ms: f64,
    pub fake_times_ms: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResult {
    pub email: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deliverable: Option<bool>,
    pub confidence: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catch_all: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    pub source: Source,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<Signals>,
    pub processing_time_ms: f64,
}

impl VerifyResult {
    pub fn bad_syntax(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Invalid,
            deliverable: Some(false),
            confidence: 0,
            catch_all: None,
            retry_after: None,
            source: Source::System,
            reason: "bad_syntax".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn no_mx(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Invalid,
            deliverable: Some(false),
            confidence: 0,
            catch_all: None,
            retry_after: None,
            source: Source::System,
            reason: "no_mx".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn circuit_breaker_open(email: &str, retry_after: u64) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Risky,
            deliverable: None,
            confidence: 0,
            catch_all: None,
            retry_after: Some(retry_after),
            source: Source::System,
            reason: "circuit_breaker_open".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn quota_exceeded(email: &str, retry_after: Option<u64>) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Risky,
            deliverable: None,
            confidence: 0,
            catch_all: None,
            retry_after,
            source: Source::System,
            reason: "quota_exceeded".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn ip_pool_exhausted(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Unknown,
            deliverable: None,
            confidence: 0,
            catch_all: None,
            retry_after: None,
            source: Source::System,
            reason: "ip_pool_exhausted".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn probe_engine_error(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Unknown,
            deliverable: None,
            confidence: 0,
            catch_all: None,
            retry_after: None,
            source: Source::System,
            reason: "probe_engine_error".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    /// The fast path was inconclusive (or unconfigured) and `use_probe` was
    /// false, so there is nothing left to resolve the address with.
    pub fn probe_skipped(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Unknown,
            deliverable: None,
            confidence: 0,
            catch_all: None,
            retry_after: None,
            source: Source::System,
            reason: "probe_skipped".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn fast_path_valid(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Valid,
            deliverable: Some(true),
            confidence: 90,
            catch_all: Some(false),
            retry_after: None,
            source: Source::Omkar,
            reason: "fast_path".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn fast_path_invalid(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: Status::Invalid,
            deliverable: Some(false),
            confidence: 10,
            catch_all: Some(false),
            retry_after: None,
            source: Source::Omkar,
            reason: "fast_path".to_string(),
            signals: None,
            processing_time_ms: 0.0,
        }
    }

    pub fn from_probe(
        email: &str,
        confidence: u32,
        status: verify_scoring::Status,
        catch_all: bool,
        signals: Signals,
    ) -> Self {
        let status = match status {
            verify_scoring::Status::Valid => Status::Valid,
            verify_scoring::Status::Risky => Status::Risky,
        };
        Self {
            email: email.to_string(),
            status,
            deliverable: Some(matches!(status, Status::Valid)),
            confidence,
            catch_all: Some(catch_all),
            retry_after: None,
            source: Source::ProbeEngine,
            reason: "probe_engine".to_string(),
            signals: Some(signals),
            processing_time_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub results: Vec<VerifyResult>,
    pub total_processed: usize,
    pub total_errors: usize,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub emails: Vec<String>,
    pub customer_id: String,
    #[serde(default)]
    pub use_probe: bool,
    #[serde(default)]
    pub ip_index: Option<usize>,
}

#[cfg(test)]
mod test {
    use super::*;
    use verify_scoring::{banner, queue_id, timing};

    fn sample_signals() -> Signals {
        let fake_times_ms = vec![40.0, 42.0];
        Signals {
            fake_rejected: Some(false),
            queue_id: queue_id::detect("250 2.0.0 Ok: queued as 1A2B3C4D5E6F"),
            timing_ratio: timing::analyze(90.0, &fake_times_ms),
            spf: SpfRecord {
                present: true,
                strict: true,
                text: Some("v=spf1 -all".to_string()),
            },
            mta: banner::parse("220 mail.example.com ESMTP Postfix"),
            real_code: 250,
            fake_codes: vec![250, 250],
            real_time_ms: 90.0,
            fake_times_ms,
        }
    }

    #[test]
    fn from_probe_carries_signals_through_to_the_result() {
        let result = VerifyResult::from_probe(
            "jane@example.com",
            82,
            verify_scoring::Status::Valid,
            false,
            sample_signals(),
        );
        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.confidence, 82);
        assert_eq!(result.source, Source::ProbeEngine);
        let signals = result.signals.expect("probe results carry their signals");
        assert!(signals.queue_id.detected);
        assert!(signals.spf.strict);
    }

    #[test]
    fn system_results_never_carry_signals() {
        assert!(VerifyResult::bad_syntax("x").signals.is_none());
        assert!(VerifyResult::circuit_breaker_open("x@example.com", 12).signals.is_none());
    }
}
