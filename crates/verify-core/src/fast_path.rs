use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastPathError {
    #[error("fast path http error: {0}")]
    Http(String),
}

#[derive(Debug, Clone)]
pub struct FastPathOutcome {
    pub is_valid: bool,
    pub catch_all: bool,
}

#[derive(Debug, Deserialize)]
struct FastPathBody {
    is_valid: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    catch_all: Option<bool>,
    #[serde(default)]
    is_free_email: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    score: Option<i64>,
}

/// Thin client over the external "cheap and often conclusive" verifier.
/// A non-200 response or transport failure is reported as a single error
/// variant; the orchestrator decides how to react (fall through to probing).
pub struct FastPathClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl FastPathClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builds with static config");
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub async fn verify(&self, email: &str) -> Result<FastPathOutcome, FastPathError> {
        let resp = self
            .http
            .get(&self.base_url)
            .header("API-Key", &self.api_key)
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|err| FastPathError::Http(err.to_string()))?;

        if !resp.status().is_success() {
            return Err(FastPathError::Http(format!("status {}", resp.status())));
        }

        let body: FastPathBody = resp
            .json()
            .await
            .map_err(|err| FastPathError::Http(err.to_string()))?;

        let catch_all = body.catch_all.unwrap_or(false) || body.status.contains("catch");
        tracing::debug!(
            email = %email,
            status = %body.status,
            is_free_email = ?body.is_free_email,
            reason = body.reason.as_deref().unwrap_or(""),
            score = ?body.score,
            "fast path response"
        );
        Ok(FastPathOutcome { is_valid: body.is_valid, catch_all })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn catch_all_detected_from_status_substring() {
        let body = FastPathBody {
            is_valid: true,
            status: "catch_all_detected".to_string(),
            catch_all: None,
            is_free_email: None,
            reason: None,
            score: None,
        };
        assert!(body.catch_all.unwrap_or(false) || body.status.contains("catch"));
    }
}
