//! HTTP routes and handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use modgate_core::{ModerationRequest, Region};
use modgate_engine::ModerationEngine;
use modgate_rules::{MemoryRuleStore, RuleDraft, RuleRecord, RuleUpdate};
use modgate_telemetry::{AuditReader, PersistedAuditRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::generator::MockGenerator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ModerationEngine>,
    pub store: Arc<MemoryRuleStore>,
    pub generator: Arc<MockGenerator>,
    pub audit_reader: Arc<AuditReader>,
    pub metrics: PrometheusHandle,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/chat", post(chat))
        .route("/api/rules", get(list_rules).post(create_rule))
        .route(
            "/api/rules/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/api/audit", get(recent_audits))
        .fallback(fallback)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// Chat request from the operator UI or an API client
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    region: Region,
    #[serde(default)]
    session_id: Option<String>,
}

/// Chat response after moderation
#[derive(Debug, Serialize)]
struct ChatResponse {
    response: String,
    request_id: String,
    is_flagged: bool,
    is_blocked: bool,
    latency_ms: f64,
    triggered_rules: Vec<String>,
}

/// Generate a reply and route it through the moderation engine.
/// There is no bypass path: every reply goes through `moderate`.
async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Json<ChatResponse> {
    debug!(region = %req.region, "chat request received");

    let bot_response = state.generator.respond(&req.message);
    let mut request =
        ModerationRequest::new(req.message, bot_response).with_region(req.region);
    if let Some(session_id) = req.session_id {
        request = request.with_session_id(session_id);
    }

    let result = state.engine.moderate(request).await;

    Json(ChatResponse {
        response: result.final_response.clone(),
        request_id: result.request_id.clone(),
        is_flagged: result.is_flagged,
        is_blocked: result.is_blocked,
        latency_ms: result.latency_ms(),
        triggered_rules: result
            .triggered
            .iter()
            .map(|o| o.rule_name.clone())
            .collect(),
    })
}

async fn list_rules(State(state): State<AppState>) -> Json<Vec<RuleRecord>> {
    Json(state.store.list())
}

async fn create_rule(
    State(state): State<AppState>,
    Json(draft): Json<RuleDraft>,
) -> Result<(StatusCode, Json<RuleRecord>), AppError> {
    let rule = state
        .store
        .create(draft)
        .map_err(|e| AppError::Invalid(e.to_string()))?;
    info!(rule_id = rule.id, rule = %rule.name, "rule created");
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<RuleRecord>, AppError> {
    state.store.get(id).map(Json).ok_or(AppError::NotFound)
}

async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<RuleUpdate>,
) -> Result<Json<RuleRecord>, AppError> {
    if state.store.get(id).is_none() {
        return Err(AppError::NotFound);
    }
    let rule = state
        .store
        .update(id, update)
        .map_err(|e| AppError::Invalid(e.to_string()))?;
    info!(rule_id = rule.id, "rule updated");
    Ok(Json(rule))
}

async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, AppError> {
    state.store.remove(id).map_err(|_| AppError::NotFound)?;
    info!(rule_id = id, "rule deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

async fn recent_audits(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<PersistedAuditRecord>>, AppError> {
    let records = state
        .audit_reader
        .tail(query.limit.unwrap_or(50))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(records))
}

async fn fallback() -> AppError {
    AppError::NotFound
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    NotFound,
    Invalid(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            AppError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = json!({
            "error": {
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}
