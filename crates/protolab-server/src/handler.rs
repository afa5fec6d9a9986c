use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::json;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::timeout;
use tracing::info;

use protolab_harness::{BatteryReport, GuardPass, ScenarioHarness, Submission};
use protolab_types::{ContaminationRecord, JsonValue, MergeStrategy};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared handler state. One harness, and so one ancestor, per process.
#[derive(Clone)]
pub struct AppState {
    pub harness: Arc<Mutex<ScenarioHarness>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(harness: ScenarioHarness, config: ServerConfig) -> Self {
        Self {
            harness: Arc::new(Mutex::new(harness)),
            config: Arc::new(config),
        }
    }

    /// Wait for the harness, up to the configured request deadline.
    pub async fn lock_harness(&self) -> ServerResult<MutexGuard<'_, ScenarioHarness>> {
        timeout(self.config.request_timeout(), self.harness.lock())
            .await
            .map_err(|_| ServerError::Timeout(self.config.request_timeout_ms))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    pub contamination_detected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_attribute: Option<JsonValue>,
    pub message: String,
    pub records: Vec<ContaminationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub contamination_detected: bool,
    pub watched_attributes: BTreeMap<String, JsonValue>,
    pub records: Vec<ContaminationRecord>,
    pub ancestor_mode: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub success: bool,
    pub restored: usize,
    pub contamination_detected_after: bool,
}

/// Nesting serde_json accepts before giving up on a body.
pub const BODY_NESTING_LIMIT: usize = 128;

fn parse_payload(body: &Bytes) -> ServerResult<JsonValue> {
    serde_json::from_slice(body).map_err(|e| {
        // serde_json reports its nesting limit as a syntax error.
        if e.is_syntax() && e.to_string().starts_with("recursion limit exceeded") {
            ServerError::PayloadTooDeep {
                limit: BODY_NESTING_LIMIT,
            }
        } else {
            ServerError::MalformedPayload(e.to_string())
        }
    })
}

fn merge_response(submission: Submission, primary: &str) -> (StatusCode, Json<MergeResponse>) {
    let contamination_detected = submission.contamination_detected();
    let watched_attribute = submission.probe.get(primary).cloned();
    let strategy = submission.strategy;

    match submission.outcome {
        Ok(result) => {
            let message = if contamination_detected {
                format!("{strategy} completed; shared ancestor is contaminated")
            } else {
                format!("{strategy} completed")
            };
            let body = MergeResponse {
                success: true,
                result: Some(result),
                contamination_detected,
                watched_attribute,
                message,
                records: submission.records,
                error: None,
            };
            (StatusCode::OK, Json(body))
        }
        Err(err) => {
            let error = ServerError::from(err);
            let body = MergeResponse {
                success: false,
                result: None,
                contamination_detected,
                watched_attribute,
                message: format!("{strategy} failed"),
                records: submission.records,
                error: Some(error.to_string()),
            };
            (error.status_code(), Json(body))
        }
    }
}

async fn submit(
    state: AppState,
    strategy: MergeStrategy,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<MergeResponse>)> {
    let payload = parse_payload(&body)?;
    let submission = state.lock_harness().await?.submit(strategy, &payload)?;
    info!(
        %strategy,
        guarded = submission.guard_enabled,
        contaminated = submission.contamination_detected(),
        "merge request"
    );
    Ok(merge_response(submission, &state.config.primary_watched))
}

/// `POST /merge-defaults-deep`
pub async fn merge_defaults_deep_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<MergeResponse>)> {
    submit(state, MergeStrategy::DefaultsDeep, body).await
}

/// `POST /merge`
pub async fn merge_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<MergeResponse>)> {
    submit(state, MergeStrategy::Merge, body).await
}

/// `POST /merge-with`, concatenating arrays.
pub async fn merge_with_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<MergeResponse>)> {
    submit(state, MergeStrategy::MergeWith, body).await
}

/// `GET /status`
pub async fn status_handler(State(state): State<AppState>) -> ServerResult<Json<StatusResponse>> {
    let harness = state.lock_harness().await?;
    let probe = harness.status()?;
    let records = harness.contamination()?;
    Ok(Json(StatusResponse {
        contamination_detected: probe.detected || !records.is_empty(),
        watched_attributes: probe.exposed,
        records,
        ancestor_mode: harness.mode().as_str(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// `POST /reset`
pub async fn reset_handler(State(state): State<AppState>) -> ServerResult<Json<ResetResponse>> {
    let harness = state.lock_harness().await?;
    let restored = harness.reset()?;
    let after = harness.status()?.detected || !harness.contamination()?.is_empty();
    info!(restored, "ancestor reset");
    Ok(Json(ResetResponse {
        success: !after,
        restored,
        contamination_detected_after: after,
    }))
}

/// `POST /scenarios/run`
pub async fn run_battery_handler(
    State(state): State<AppState>,
) -> ServerResult<Json<BatteryReport>> {
    let report = state.lock_harness().await?.run_battery(&GuardPass::BOTH)?;
    Ok(Json(report))
}

/// Health check handler.
pub async fn health_handler() -> Json<JsonValue> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
