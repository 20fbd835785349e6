use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::access::{ActorId, IdentityResolver, Role};
use crate::workflows::error::WorkflowError;
use crate::workflows::identity_from_headers;
use crate::workflows::notify::NotificationPublisher;

use super::domain::{AdminDecision, Recommendation, SubmissionId, SubmissionType};
use super::service::SubmissionWorkflow;
use super::store::SubmissionStore;

/// Shared state for the submission endpoints.
pub struct SubmissionRouterState<S, N> {
    pub service: Arc<SubmissionWorkflow<S, N>>,
    pub resolver: Arc<dyn IdentityResolver>,
}

impl<S, N> Clone for SubmissionRouterState<S, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    submission_type: SubmissionType,
    #[serde(default)]
    document_refs: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationRequest {
    recommendation: Recommendation,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    decision: AdminDecision,
    #[serde(default)]
    feedback: Option<String>,
}

/// Router builder exposing the verification review endpoints.
pub fn submission_router<S, N>(state: SubmissionRouterState<S, N>) -> Router
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/submissions", post(submit_handler::<S, N>))
        .route(
            "/api/v1/submissions/:submission_id",
            get(status_handler::<S, N>),
        )
        .route(
            "/api/v1/submissions/:submission_id/recommendation",
            post(recommend_handler::<S, N>),
        )
        .route(
            "/api/v1/submissions/:submission_id/decision",
            post(decide_handler::<S, N>),
        )
        .route(
            "/api/v1/verification/:role/:subject_id",
            get(progress_handler::<S, N>),
        )
        .with_state(state)
}

pub(crate) async fn submit_handler<S, N>(
    State(state): State<SubmissionRouterState<S, N>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.submit(
        &actor,
        request.submission_type,
        request.document_refs,
        Utc::now(),
    ) {
        Ok(submission) => {
            (StatusCode::ACCEPTED, axum::Json(submission.status_view())).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<S, N>(
    State(state): State<SubmissionRouterState<S, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
) -> Response
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.get(&SubmissionId(submission_id), &actor) {
        Ok(submission) => (StatusCode::OK, axum::Json(submission.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn recommend_handler<S, N>(
    State(state): State<SubmissionRouterState<S, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.recommend(
        &SubmissionId(submission_id),
        &actor,
        request.recommendation,
        request.notes,
        Utc::now(),
    ) {
        Ok(submission) => (StatusCode::OK, axum::Json(submission.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn decide_handler<S, N>(
    State(state): State<SubmissionRouterState<S, N>>,
    headers: HeaderMap,
    Path(submission_id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.decide(
        &SubmissionId(submission_id),
        &actor,
        request.decision,
        request.feedback,
        Utc::now(),
    ) {
        Ok(submission) => (StatusCode::OK, axum::Json(submission.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn progress_handler<S, N>(
    State(state): State<SubmissionRouterState<S, N>>,
    headers: HeaderMap,
    Path((role, subject_id)): Path<(String, String)>,
) -> Response
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };
    let subject_role = match role.parse::<Role>() {
        Ok(role) => role,
        Err(_) => return WorkflowError::Validation { field: "role" }.into_response(),
    };

    match state
        .service
        .verification_progress(&actor, &ActorId::new(subject_id), subject_role)
    {
        Ok(progress) => (StatusCode::OK, axum::Json(progress)).into_response(),
        Err(err) => err.into_response(),
    }
}
