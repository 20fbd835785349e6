use std::sync::Arc;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use careflow::access::{Action, AuthorizationGate, Identity, IdentityResolver, Resource};
use careflow::config::PolicyConfig;
use careflow::workflows::dispute::{dispute_router, DisputeRouterState, DisputeWorkflow};
use careflow::workflows::submission::{
    submission_router, SubmissionRouterState, SubmissionWorkflow,
};
use careflow::workflows::WorkflowError;
use serde_json::json;

use crate::infra::{
    AppState, MemoryAuditSink, MemoryDisputeStore, MemoryNotificationPublisher,
    MemorySubmissionStore,
};

/// Shared state for the governance endpoints: the policy dials and the
/// gate-checked audit trail.
#[derive(Clone)]
pub(crate) struct GovernanceState {
    pub(crate) policy: PolicyConfig,
    pub(crate) gate: Arc<AuthorizationGate>,
    pub(crate) audit: Arc<MemoryAuditSink>,
    pub(crate) resolver: Arc<dyn IdentityResolver>,
}

pub(crate) fn app_router(
    submissions: Arc<SubmissionWorkflow<MemorySubmissionStore, MemoryNotificationPublisher>>,
    disputes: Arc<DisputeWorkflow<MemoryDisputeStore, MemoryNotificationPublisher>>,
    resolver: Arc<dyn IdentityResolver>,
    governance: GovernanceState,
) -> Router {
    submission_router(SubmissionRouterState {
        service: submissions,
        resolver: resolver.clone(),
    })
    .merge(dispute_router(DisputeRouterState {
        service: disputes,
        resolver,
    }))
    .route("/health", get(healthcheck))
    .route("/ready", get(readiness_endpoint))
    .route("/metrics", get(metrics_endpoint))
    .route("/api/v1/policy", get(policy_endpoint))
    .route("/api/v1/audit", get(audit_log_endpoint))
    .layer(Extension(governance))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Single source of truth for the workflow timing constants the rest of the
/// platform quotes (escrow cooling-off, payment lockout).
pub(crate) async fn policy_endpoint(
    Extension(state): Extension<GovernanceState>,
) -> Json<serde_json::Value> {
    Json(json!({
        "escrow_hold_hours": state.policy.escrow_hold_hours,
        "payment_lockout_days": state.policy.payment_lockout_days,
    }))
}

/// Gate-checked read over the append-only audit trail, for compliance
/// review.
pub(crate) async fn audit_log_endpoint(
    Extension(state): Extension<GovernanceState>,
    headers: HeaderMap,
) -> Response {
    let actor = match bearer_identity(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match state
        .gate
        .authorize(&actor, Resource::AuditLog, Action::Read, None)
        .into_result()
    {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "entries": state.audit.entries() })),
        )
            .into_response(),
        Err(reason) => WorkflowError::Forbidden(reason).into_response(),
    }
}

fn bearer_identity(
    resolver: &dyn IdentityResolver,
    headers: &HeaderMap,
) -> Result<Identity, Response> {
    let credential = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| WorkflowError::Unauthenticated.into_response())?;

    resolver
        .resolve(credential.trim())
        .map_err(|_| WorkflowError::Unauthenticated.into_response())
}
