use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::access::DenyReason;

use super::dispute::domain::DisputeType;

/// Persistence failures shared by the submission and dispute stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("stale version")]
    StaleVersion,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Business-rule failures returned as typed results by every workflow
/// operation. Only infrastructure trouble (`Store` unavailability)
/// represents an unexpected fault.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("unauthorized")]
    Unauthenticated,
    /// Role or ownership check failed. The internal reason is audited by
    /// the gate; callers get this uniform message regardless of cause.
    #[error("forbidden")]
    Forbidden(DenyReason),
    #[error("transition not allowed from status '{current}'")]
    InvalidTransition { current: &'static str },
    #[error("missing required field '{field}'")]
    Validation { field: &'static str },
    #[error("disputes of type '{dispute_type}' must be escalated to an admin")]
    EscalationRequired { dispute_type: DisputeType },
    #[error("entity changed concurrently, reload and retry")]
    Conflict,
    #[error("entity is locked by another transition, retry shortly")]
    Busy,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Duplicate | StoreError::StaleVersion => Self::Conflict,
            other => Self::Store(other),
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            WorkflowError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, json!({ "error": self.to_string() }))
            }
            WorkflowError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, json!({ "error": "forbidden" }))
            }
            WorkflowError::InvalidTransition { current } => (
                StatusCode::CONFLICT,
                json!({ "error": self.to_string(), "current_status": current }),
            ),
            WorkflowError::Validation { field } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "field": field }),
            ),
            WorkflowError::EscalationRequired { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "kind": "escalation_required" }),
            ),
            WorkflowError::Conflict => {
                (StatusCode::CONFLICT, json!({ "error": self.to_string() }))
            }
            WorkflowError::Busy => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": self.to_string() }),
            ),
            WorkflowError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, json!({ "error": "record not found" }))
            }
            WorkflowError::Store(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": self.to_string() }),
            ),
        };

        (status, Json(body)).into_response()
    }
}
