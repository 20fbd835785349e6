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

use crate::access::IdentityResolver;
use crate::workflows::identity_from_headers;
use crate::workflows::notify::NotificationPublisher;

use super::domain::DisputeId;
use super::service::{DisputeWorkflow, RaiseDisputeRequest};
use super::store::DisputeStore;

/// Shared state for the dispute endpoints.
pub struct DisputeRouterState<S, N> {
    pub service: Arc<DisputeWorkflow<S, N>>,
    pub resolver: Arc<dyn IdentityResolver>,
}

impl<S, N> Clone for DisputeRouterState<S, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EscalationRequest {
    notes: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResolutionRequest {
    resolution: String,
}

/// Router builder exposing the dispute lifecycle endpoints.
pub fn dispute_router<S, N>(state: DisputeRouterState<S, N>) -> Router
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/disputes", post(raise_handler::<S, N>))
        .route("/api/v1/disputes/:dispute_id", get(status_handler::<S, N>))
        .route(
            "/api/v1/disputes/:dispute_id/assignment",
            post(assign_handler::<S, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/escalation",
            post(escalate_handler::<S, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/resolution",
            post(resolve_handler::<S, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/closure",
            post(close_handler::<S, N>),
        )
        .route(
            "/api/v1/disputes/:dispute_id/escrow",
            get(escrow_handler::<S, N>),
        )
        .with_state(state)
}

pub(crate) async fn raise_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<RaiseDisputeRequest>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.raise(&actor, request, Utc::now()) {
        Ok(dispute) => (StatusCode::CREATED, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.get(&DisputeId(dispute_id), &actor) {
        Ok(dispute) => (StatusCode::OK, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn assign_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state
        .service
        .assign(&DisputeId(dispute_id), &actor, Utc::now())
    {
        Ok(dispute) => (StatusCode::OK, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn escalate_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<EscalationRequest>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state
        .service
        .escalate(&DisputeId(dispute_id), &actor, request.notes, Utc::now())
    {
        Ok(dispute) => (StatusCode::OK, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resolve_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
    axum::Json(request): axum::Json<ResolutionRequest>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state.service.resolve(
        &DisputeId(dispute_id),
        &actor,
        request.resolution,
        Utc::now(),
    ) {
        Ok(dispute) => (StatusCode::OK, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn close_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state
        .service
        .close(&DisputeId(dispute_id), &actor, Utc::now())
    {
        Ok(dispute) => (StatusCode::OK, axum::Json(dispute.status_view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn escrow_handler<S, N>(
    State(state): State<DisputeRouterState<S, N>>,
    headers: HeaderMap,
    Path(dispute_id): Path<String>,
) -> Response
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    let actor = match identity_from_headers(state.resolver.as_ref(), &headers) {
        Ok(actor) => actor,
        Err(err) => return err.into_response(),
    };

    match state
        .service
        .escrow_state(&DisputeId(dispute_id), &actor, Utc::now())
    {
        Ok(escrow) => (StatusCode::OK, axum::Json(escrow)).into_response(),
        Err(err) => err.into_response(),
    }
}
