use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{Action, ActorId, AuthorizationGate, DenyReason, Identity, Resource, Role};
use crate::audit::AuditEntry;
use crate::config::PolicyConfig;
use crate::workflows::error::{StoreError, WorkflowError};
use crate::workflows::lock::EntityLocks;
use crate::workflows::notify::{NotificationPublisher, WorkflowSignal};

use super::domain::{Dispute, DisputeId, DisputeStatus, DisputeType, JobId};
use super::store::DisputeStore;

static DISPUTE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_dispute_id() -> DisputeId {
    let id = DISPUTE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DisputeId(format!("disp-{id:06}"))
}

/// Request payload for opening a dispute.
#[derive(Debug, Clone, Deserialize)]
pub struct RaiseDisputeRequest {
    pub job_id: JobId,
    pub against: ActorId,
    pub dispute_type: DisputeType,
    pub description: String,
    #[serde(default)]
    pub evidence_refs: Vec<String>,
}

/// Service advancing user-raised disputes through moderator review,
/// escalation, and resolution, and owning the escrow release gate.
pub struct DisputeWorkflow<S, N> {
    gate: Arc<AuthorizationGate>,
    store: Arc<S>,
    notifications: Arc<N>,
    locks: Arc<EntityLocks>,
    policy: PolicyConfig,
}

impl<S, N> DisputeWorkflow<S, N>
where
    S: DisputeStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        gate: Arc<AuthorizationGate>,
        store: Arc<S>,
        notifications: Arc<N>,
        locks: Arc<EntityLocks>,
        policy: PolicyConfig,
    ) -> Self {
        Self {
            gate,
            store,
            notifications,
            locks,
            policy,
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Open a dispute. Payment disputes start their escrow cooling-off
    /// clock here; only one open dispute may exist per
    /// (job, raised_by, against) triple.
    pub fn raise(
        &self,
        actor: &Identity,
        request: RaiseDisputeRequest,
        now: DateTime<Utc>,
    ) -> Result<Dispute, WorkflowError> {
        self.authorize(actor, Action::Write, &actor.id)?;
        if request.description.trim().is_empty() {
            return Err(WorkflowError::Validation {
                field: "description",
            });
        }
        if request.against == actor.id {
            return Err(WorkflowError::Validation { field: "against" });
        }

        if self
            .store
            .find_open(&request.job_id, &actor.id, &request.against)?
            .is_some()
        {
            return Err(WorkflowError::Conflict);
        }

        let dispute = Dispute::open(
            next_dispute_id(),
            request.job_id,
            actor.id.clone(),
            request.against,
            request.dispute_type,
            request.description,
            request.evidence_refs,
            self.policy.escrow_hold(),
            now,
        );
        let entry = AuditEntry::transition(
            actor,
            "dispute_raise",
            Resource::Dispute,
            dispute.id.0.clone(),
            None,
            dispute.status.label(),
            now,
        );
        Ok(self.store.insert(dispute, entry)?)
    }

    /// A moderator takes the dispute: Open -> UnderModeratorReview.
    pub fn assign(
        &self,
        id: &DisputeId,
        actor: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Dispute, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut dispute = self.load(id)?;
        self.authorize(actor, Action::Write, &dispute.raised_by)?;
        self.require_tier(actor, Role::Moderator)?;

        let prior = dispute.status;
        let expected = dispute.version;
        dispute.assign_moderator(actor.id.clone(), now)?;
        let entry = AuditEntry::transition(
            actor,
            "assign_moderator",
            Resource::Dispute,
            dispute.id.0.clone(),
            Some(prior.label()),
            dispute.status.label(),
            now,
        );
        Ok(self.store.save(dispute, expected, entry)?)
    }

    /// Hand the dispute to admin authority. Notes are mandatory.
    pub fn escalate(
        &self,
        id: &DisputeId,
        actor: &Identity,
        notes: String,
        now: DateTime<Utc>,
    ) -> Result<Dispute, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut dispute = self.load(id)?;
        self.authorize(actor, Action::Write, &dispute.raised_by)?;
        self.require_tier(actor, Role::Moderator)?;
        self.require_assigned(actor, &dispute)?;

        let prior = dispute.status;
        let expected = dispute.version;
        dispute.escalate(notes, now)?;
        let entry = AuditEntry::transition(
            actor,
            "moderator_escalate",
            Resource::Dispute,
            dispute.id.0.clone(),
            Some(prior.label()),
            dispute.status.label(),
            now,
        );
        let stored = self.store.save(dispute, expected, entry)?;
        self.signal("dispute.escalated", &stored);
        Ok(stored)
    }

    /// Resolve the dispute. Admins rule on escalated disputes; the
    /// assigned moderator may settle low/medium severity types directly,
    /// while payment and other high-severity disputes demand escalation.
    pub fn resolve(
        &self,
        id: &DisputeId,
        actor: &Identity,
        resolution: String,
        now: DateTime<Utc>,
    ) -> Result<Dispute, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut dispute = self.load(id)?;
        self.authorize(actor, Action::Write, &dispute.raised_by)?;
        self.require_tier(actor, Role::Moderator)?;

        let prior = dispute.status;
        let expected = dispute.version;
        let action = if actor.role.dominates(Role::Admin) && dispute.status == DisputeStatus::Escalated
        {
            dispute.resolve_by_admin(actor.id.clone(), resolution, now)?;
            "admin_resolve"
        } else {
            self.require_assigned(actor, &dispute)?;
            dispute.resolve_by_moderator(actor.id.clone(), resolution, now)?;
            "moderator_resolve"
        };
        let entry = AuditEntry::transition(
            actor,
            action,
            Resource::Dispute,
            dispute.id.0.clone(),
            Some(prior.label()),
            dispute.status.label(),
            now,
        );
        let stored = self.store.save(dispute, expected, entry)?;
        self.signal("dispute.resolved", &stored);
        Ok(stored)
    }

    /// Final closure after the appeal-inspection window. Idempotent.
    pub fn close(
        &self,
        id: &DisputeId,
        actor: &Identity,
        now: DateTime<Utc>,
    ) -> Result<Dispute, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut dispute = self.load(id)?;
        self.authorize(actor, Action::Write, &dispute.raised_by)?;
        self.require_tier(actor, Role::Admin)?;

        let prior = dispute.status;
        let expected = dispute.version;
        if !dispute.close(now)? {
            return Ok(dispute);
        }
        let entry = AuditEntry::transition(
            actor,
            "close",
            Resource::Dispute,
            dispute.id.0.clone(),
            Some(prior.label()),
            dispute.status.label(),
            now,
        );
        let stored = self.store.save(dispute, expected, entry)?;
        self.signal("dispute.closed", &stored);
        Ok(stored)
    }

    /// Gate-checked read; participants see disputes they are party to.
    pub fn get(&self, id: &DisputeId, actor: &Identity) -> Result<Dispute, WorkflowError> {
        let dispute = self.load(id)?;
        let owner = participant_owner(&dispute, actor);
        self.authorize_read(actor, owner)?;
        Ok(dispute)
    }

    /// The escrow gate consumed by the payment collaborator: funds move
    /// only once the dispute is resolved AND the cooling-off deadline has
    /// passed.
    pub fn escrow_state(
        &self,
        id: &DisputeId,
        actor: &Identity,
        now: DateTime<Utc>,
    ) -> Result<EscrowState, WorkflowError> {
        let dispute = self.load(id)?;
        let owner = participant_owner(&dispute, actor);
        self.authorize_read(actor, owner)?;
        Ok(EscrowState {
            dispute_id: dispute.id.clone(),
            status: dispute.status.label(),
            escrow_hold_until: dispute.escrow_hold_until,
            releasable: dispute.funds_releasable(now),
        })
    }

    fn authorize(
        &self,
        actor: &Identity,
        action: Action,
        owner: &ActorId,
    ) -> Result<(), WorkflowError> {
        self.gate
            .authorize(actor, Resource::Dispute, action, Some(owner))
            .into_result()
            .map_err(WorkflowError::Forbidden)
    }

    fn authorize_read(&self, actor: &Identity, owner: &ActorId) -> Result<(), WorkflowError> {
        self.authorize(actor, Action::Read, owner)
    }

    fn require_tier(&self, actor: &Identity, tier: Role) -> Result<(), WorkflowError> {
        if actor.role.dominates(tier) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(self.gate.deny(
                actor,
                Resource::Dispute,
                Action::Write,
                DenyReason::InsufficientRole,
            )))
        }
    }

    fn require_assigned(&self, actor: &Identity, dispute: &Dispute) -> Result<(), WorkflowError> {
        match &dispute.moderator {
            Some(assigned) if *assigned == actor.id || actor.role.dominates(Role::Admin) => Ok(()),
            _ => Err(WorkflowError::Forbidden(self.gate.deny(
                actor,
                Resource::Dispute,
                Action::Write,
                DenyReason::NotAssigned,
            ))),
        }
    }

    fn load(&self, id: &DisputeId) -> Result<Dispute, WorkflowError> {
        self.store
            .load(id)?
            .ok_or(WorkflowError::Store(StoreError::NotFound))
    }

    fn signal(&self, topic: &'static str, dispute: &Dispute) {
        let signal = WorkflowSignal {
            topic,
            entity_kind: Resource::Dispute,
            entity_id: dispute.id.0.clone(),
            status: dispute.status.label(),
        };
        if let Err(err) = self.notifications.publish(signal) {
            tracing::warn!(%err, dispute = %dispute.id.0, "notification dispatch failed");
        }
    }
}

/// Which participant identity anchors the ownership check for `actor`.
/// A dispute is owned by its parties: the raiser, the respondent, or an
/// agency linked to either.
fn participant_owner<'a>(dispute: &'a Dispute, actor: &Identity) -> &'a ActorId {
    if actor.owns(&dispute.against) && !actor.owns(&dispute.raised_by) {
        &dispute.against
    } else {
        &dispute.raised_by
    }
}

/// Escrow snapshot for the payment collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct EscrowState {
    pub dispute_id: DisputeId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_hold_until: Option<DateTime<Utc>>,
    pub releasable: bool,
}
