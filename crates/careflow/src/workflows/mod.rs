//! Submission and dispute state machines, their persistence seams, and the
//! shared transition plumbing (errors, per-entity locks, notifications).

pub mod dispute;
pub mod error;
pub mod lock;
pub mod notify;
pub mod submission;

pub use error::{StoreError, WorkflowError};
pub use lock::{EntityGuard, EntityLocks};
pub use notify::{NotificationPublisher, NotifyError, WorkflowSignal};

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;

use crate::access::{Identity, IdentityResolver};

/// Resolve the caller from a bearer credential. Shared by the workflow
/// routers so every endpoint authenticates the same way.
pub(crate) fn identity_from_headers(
    resolver: &dyn IdentityResolver,
    headers: &HeaderMap,
) -> Result<Identity, WorkflowError> {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(WorkflowError::Unauthenticated)?;

    resolver
        .resolve(credential.trim())
        .map_err(|_| WorkflowError::Unauthenticated)
}
