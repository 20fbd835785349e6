use std::sync::Arc;

use chrono::Utc;

use super::identity::{ActorId, Identity};
use super::matrix::{Action, PermissionMatrix, PermissionOutcome, Resource};
use crate::audit::{AuditEntry, AuditSink};

/// Internal denial reason. Audited, never shown to the caller: both role
/// and ownership failures surface as the same uniform "forbidden" shape so
/// a flatly denied role cannot probe ownership through a different error
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    InsufficientRole,
    NotOwner,
    OwnerUnknown,
    NotAssigned,
}

impl DenyReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InsufficientRole => "insufficient-role",
            Self::NotOwner => "not-owner",
            Self::OwnerUnknown => "owner-unknown",
            Self::NotAssigned => "not-assigned",
        }
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(reason),
        }
    }
}

/// Central gate consulted by every protected operation.
///
/// Reads the matrix and the caller's linkage set; never mutates the target
/// entity. Denials are appended to the audit sink, allows are left to the
/// workflow's own transition record to avoid double-counting.
pub struct AuthorizationGate {
    matrix: PermissionMatrix,
    audit: Arc<dyn AuditSink>,
}

impl AuthorizationGate {
    pub fn new(matrix: PermissionMatrix, audit: Arc<dyn AuditSink>) -> Self {
        Self { matrix, audit }
    }

    pub fn matrix(&self) -> &PermissionMatrix {
        &self.matrix
    }

    /// Decide whether `identity` may perform `action` on `resource`.
    ///
    /// The role outcome is checked before ownership: a role without any
    /// grant is denied `insufficient-role` without ever inspecting
    /// `target_owner`. `AllowOwn` requires the caller to supply the owning
    /// identity of the target.
    pub fn authorize(
        &self,
        identity: &Identity,
        resource: Resource,
        action: Action,
        target_owner: Option<&ActorId>,
    ) -> Decision {
        match self.matrix.lookup(identity.role, resource, action) {
            PermissionOutcome::Deny => {
                self.record_denial(identity, resource, action, DenyReason::InsufficientRole)
            }
            PermissionOutcome::Allow => Decision::Allow,
            PermissionOutcome::AllowOwn => match target_owner {
                None => self.record_denial(identity, resource, action, DenyReason::OwnerUnknown),
                Some(owner) if identity.owns(owner) => Decision::Allow,
                Some(_) => self.record_denial(identity, resource, action, DenyReason::NotOwner),
            },
        }
    }

    /// Audit and return a denial raised by a workflow's second-stage check
    /// (reviewer assignment, decision tier) so it shares the denial trail
    /// with matrix denials.
    pub fn deny(
        &self,
        identity: &Identity,
        resource: Resource,
        action: Action,
        reason: DenyReason,
    ) -> DenyReason {
        self.record_denial(identity, resource, action, reason);
        reason
    }

    fn record_denial(
        &self,
        identity: &Identity,
        resource: Resource,
        action: Action,
        reason: DenyReason,
    ) -> Decision {
        let entry = AuditEntry::denial(identity, resource, action, reason, Utc::now());
        if let Err(err) = self.audit.append(entry) {
            tracing::error!(%err, "failed to audit authorization denial");
        }
        Decision::Deny(reason)
    }
}
