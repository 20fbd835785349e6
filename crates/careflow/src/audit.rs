//! Append-only audit trail. Entries are the system's only source of
//! historical truth for compliance review and are never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::access::{Action, ActorId, DenyReason, Identity, Resource, Role};

/// Immutable record of an authorization denial or a workflow transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub actor: ActorId,
    pub actor_role: Role,
    pub action: &'static str,
    pub entity_kind: Resource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<&'static str>,
    /// Internal reason, recorded for denials only. Never surfaced to the
    /// caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Record a gate denial.
    pub fn denial(
        identity: &Identity,
        resource: Resource,
        action: Action,
        reason: DenyReason,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor: identity.id.clone(),
            actor_role: identity.role,
            action: action.label(),
            entity_kind: resource,
            entity_id: None,
            prior_status: None,
            new_status: None,
            reason: Some(reason.as_str()),
            recorded_at,
        }
    }

    /// Record an applied workflow transition.
    pub fn transition(
        actor: &Identity,
        action: &'static str,
        entity_kind: Resource,
        entity_id: impl Into<String>,
        prior_status: Option<&'static str>,
        new_status: &'static str,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor: actor.id.clone(),
            actor_role: actor.role,
            action,
            entity_kind,
            entity_id: Some(entity_id.into()),
            prior_status,
            new_status: Some(new_status),
            reason: None,
            recorded_at,
        }
    }
}

/// Append failure. Treated as infrastructure trouble, not a business error.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Append-only sink. Implementations must accept concurrent writers; for
/// workflow transitions the owning store appends the entry atomically with
/// the record update.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError>;
}
