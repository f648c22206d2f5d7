use crate::app_state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::Instrument;
use verify_core::{VerifyRequest, VerifyResponse, VerifyResult};

const MAX_BATCH: usize = 1000;

pub async fn verify(State(state): State<AppState>, Json(req): Json<VerifyRequest>) -> Response {
    if req.emails.is_empty() || req.emails.len() > MAX_BATCH {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "emails must contain between 1 and 1000 addresses"})),
        )
            .into_response();
    }
    if req.customer_id.is_empty() || req.customer_id.len() > 255 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": "customer_id must be 1-255 characters"})),
        )
            .into_response();
    }

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("verify_batch", %request_id);

    async move {
        let started = Instant::now();
        tracing::info!(batch_size = req.emails.len(), customer_id = %req.customer_id, "verify batch started");

        // Each address gets its own task, bounded by the configured worker
        // pool; order of completion is not preserved, but every result
        // carries its own `email` field so callers can still correlate.
        let mut joins: JoinSet<VerifyResult> = JoinSet::new();
        for email in &req.emails {
            let orchestrator = state.orchestrator.clone();
            let permit_source = state.worker_limit.clone();
            let customer_id = req.customer_id.clone();
            let use_probe = req.use_probe;
            let ip_index = req.ip_index;
            let email = email.clone();
            joins.spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                orchestrator.verify_one(&email, &customer_id, use_probe, ip_index).await
            });
        }
        let mut results = Vec::with_capacity(req.emails.len());
        while let Some(joined) = joins.join_next().await {
            if let Ok(result) = joined {
                results.push(result);
            }
        }

        let total_errors = results
            .iter()
            .filter(|r| matches!(r.status, verify_core::Status::Unknown))
            .count();

        let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            batch_size = results.len(),
            elapsed_ms = processing_time_ms,
            error_count = total_errors,
            "verify batch finished"
        );
        for result in &results {
            tracing::debug!(email = %result.email, status = ?result.status, confidence = result.confidence, "verify result");
        }

        Json(VerifyResponse {
            total_processed: results.len(),
            total_errors,
            results,
            processing_time_ms,
        })
        .into_response()
    }
    .instrument(span)
    .await
}

pub async fn quota_usage(
    State(state): State<AppState>,
    Path((customer_id, domain)): Path<(String, String)>,
) -> impl IntoResponse {
    let usage = state.quota.usage(&customer_id, &domain).await;
    Json(json!({
        "customer_id": customer_id,
        "domain": domain,
        "customer_used": usage.customer_used,
        "customer_limit": usage.customer_limit,
        "global_used": usage.global_used,
        "global_limit": usage.global_limit,
        "customer_reset_in": usage.customer_reset_in,
        "global_reset_in": usage.global_reset_in,
    }))
}

pub async fn reputation_snapshot(State(state): State<AppState>, Path(domain): Path<String>) -> impl IntoResponse {
    let snapshot = state.reputation.snapshot(&domain).await;
    Json(json!({
        "domain": domain,
        "degraded": snapshot.degraded,
        "bounces": snapshot.bounces,
        "false_positives": snapshot.false_positives,
        "confidence_cap": snapshot.confidence_cap(),
    }))
}

pub async fn health() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .body(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}).to_string().into())
        .expect("static health response builds")
}
