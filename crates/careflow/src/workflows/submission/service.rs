use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::access::{Action, ActorId, AuthorizationGate, DenyReason, Identity, Resource, Role};
use crate::audit::AuditEntry;
use crate::workflows::error::{StoreError, WorkflowError};
use crate::workflows::lock::EntityLocks;
use crate::workflows::notify::{NotificationPublisher, WorkflowSignal};

use super::domain::{
    AdminDecision, Recommendation, Submission, SubmissionId, SubmissionStatus, SubmissionType,
};
use super::store::SubmissionStore;

static SUBMISSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_submission_id() -> SubmissionId {
    let id = SUBMISSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SubmissionId(format!("sub-{id:06}"))
}

/// Service advancing the two-tier verification review. Every operation
/// passes the authorization gate before touching state, serializes on the
/// entity lock, and persists each transition atomically with its audit
/// entry.
pub struct SubmissionWorkflow<S, N> {
    gate: Arc<AuthorizationGate>,
    store: Arc<S>,
    notifications: Arc<N>,
    locks: Arc<EntityLocks>,
}

impl<S, N> SubmissionWorkflow<S, N>
where
    S: SubmissionStore + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(
        gate: Arc<AuthorizationGate>,
        store: Arc<S>,
        notifications: Arc<N>,
        locks: Arc<EntityLocks>,
    ) -> Self {
        Self {
            gate,
            store,
            notifications,
            locks,
        }
    }

    /// Lodge a verification artifact, opening a `Pending` review pass.
    ///
    /// A submitter with an open pass of the same type refreshes its
    /// documents instead of spawning a second lifecycle; an already
    /// approved artifact cannot be re-submitted.
    pub fn submit(
        &self,
        actor: &Identity,
        submission_type: SubmissionType,
        document_refs: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<Submission, WorkflowError> {
        self.authorize(actor, Action::Write, &actor.id)?;
        if actor.role != submission_type.audience() {
            return Err(WorkflowError::Validation {
                field: "submission_type",
            });
        }

        if let Some(open) = self.store.find_active(&actor.id, submission_type)? {
            let _guard = self.locks.acquire(&open.id.0)?;
            let mut current = self.load(&open.id)?;
            let prior = current.status;
            let expected = current.version;
            current.refresh_documents(document_refs, now)?;
            let entry = AuditEntry::transition(
                actor,
                "submission_resubmit",
                Resource::Submission,
                current.id.0.clone(),
                Some(prior.label()),
                current.status.label(),
                now,
            );
            return Ok(self.store.save(current, expected, entry)?);
        }

        let already_approved = self
            .store
            .find_by_submitter(&actor.id)?
            .iter()
            .any(|existing| {
                existing.submission_type == submission_type
                    && existing.status == SubmissionStatus::Approved
            });
        if already_approved {
            return Err(WorkflowError::InvalidTransition {
                current: SubmissionStatus::Approved.label(),
            });
        }

        let submission = Submission::new(
            next_submission_id(),
            submission_type,
            actor.id.clone(),
            document_refs,
            now,
        );
        let entry = AuditEntry::transition(
            actor,
            "submission_submit",
            Resource::Submission,
            submission.id.0.clone(),
            None,
            submission.status.label(),
            now,
        );
        Ok(self.store.insert(submission, entry)?)
    }

    /// First-tier review: Pending -> ModeratorReviewed.
    ///
    /// The first recommender becomes the assigned moderator; afterwards
    /// only the assignee (or an admin taking over) may act.
    pub fn recommend(
        &self,
        id: &SubmissionId,
        actor: &Identity,
        recommendation: Recommendation,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Submission, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut submission = self.load(id)?;
        self.authorize(actor, Action::Write, &submission.submitter)?;
        self.require_tier(actor, Role::Moderator)?;
        if let Some(assigned) = &submission.moderator {
            if *assigned != actor.id && !actor.role.dominates(Role::Admin) {
                return Err(WorkflowError::Forbidden(self.gate.deny(
                    actor,
                    Resource::Submission,
                    Action::Write,
                    DenyReason::NotAssigned,
                )));
            }
        }

        let prior = submission.status;
        let expected = submission.version;
        submission.record_recommendation(actor.id.clone(), recommendation, notes, now)?;
        let entry = AuditEntry::transition(
            actor,
            "moderator_recommend",
            Resource::Submission,
            submission.id.0.clone(),
            Some(prior.label()),
            submission.status.label(),
            now,
        );
        Ok(self.store.save(submission, expected, entry)?)
    }

    /// Binding second-tier ruling: ModeratorReviewed -> terminal or back to
    /// Pending on send-back.
    pub fn decide(
        &self,
        id: &SubmissionId,
        actor: &Identity,
        decision: AdminDecision,
        feedback: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Submission, WorkflowError> {
        let _guard = self.locks.acquire(&id.0)?;
        let mut submission = self.load(id)?;
        self.authorize(actor, Action::Write, &submission.submitter)?;
        self.require_tier(actor, Role::Admin)?;

        let prior = submission.status;
        let expected = submission.version;
        submission.apply_decision(actor.id.clone(), decision, feedback, now)?;
        let action = match decision {
            AdminDecision::Approve => "admin_approve",
            AdminDecision::SendBack => "admin_send_back",
            AdminDecision::OverrideReject => "admin_override_reject",
        };
        let entry = AuditEntry::transition(
            actor,
            action,
            Resource::Submission,
            submission.id.0.clone(),
            Some(prior.label()),
            submission.status.label(),
            now,
        );
        let stored = self.store.save(submission, expected, entry)?;

        let topic = match stored.status {
            SubmissionStatus::Approved => Some("submission.approved"),
            SubmissionStatus::Rejected => Some("submission.rejected"),
            SubmissionStatus::Pending => Some("submission.sent_back"),
            SubmissionStatus::ModeratorReviewed => None,
        };
        if let Some(topic) = topic {
            self.signal(topic, &stored);
        }

        Ok(stored)
    }

    /// Gate-checked read; submitters see their own records only.
    pub fn get(&self, id: &SubmissionId, actor: &Identity) -> Result<Submission, WorkflowError> {
        let submission = self.load(id)?;
        self.authorize(actor, Action::Read, &submission.submitter)?;
        Ok(submission)
    }

    /// Verification checklist progress for one submitter.
    pub fn verification_progress(
        &self,
        actor: &Identity,
        subject: &ActorId,
        subject_role: Role,
    ) -> Result<VerificationProgress, WorkflowError> {
        self.authorize(actor, Action::Read, subject)?;

        let submissions = self.store.find_by_submitter(subject)?;
        let required = SubmissionType::required_for(subject_role);
        let completed = required
            .iter()
            .filter(|step| {
                submissions.iter().any(|submission| {
                    submission.submission_type == **step
                        && submission.status == SubmissionStatus::Approved
                })
            })
            .count();

        Ok(VerificationProgress {
            subject: subject.clone(),
            total_steps: required.len(),
            completed_steps: completed,
            fully_verified: !required.is_empty() && completed == required.len(),
            steps: submissions.iter().map(Submission::status_view).collect(),
        })
    }

    fn authorize(
        &self,
        actor: &Identity,
        action: Action,
        owner: &ActorId,
    ) -> Result<(), WorkflowError> {
        self.gate
            .authorize(actor, Resource::Submission, action, Some(owner))
            .into_result()
            .map_err(WorkflowError::Forbidden)
    }

    fn require_tier(&self, actor: &Identity, tier: Role) -> Result<(), WorkflowError> {
        if actor.role.dominates(tier) {
            Ok(())
        } else {
            Err(WorkflowError::Forbidden(self.gate.deny(
                actor,
                Resource::Submission,
                Action::Write,
                DenyReason::InsufficientRole,
            )))
        }
    }

    fn load(&self, id: &SubmissionId) -> Result<Submission, WorkflowError> {
        self.store
            .load(id)?
            .ok_or(WorkflowError::Store(StoreError::NotFound))
    }

    fn signal(&self, topic: &'static str, submission: &Submission) {
        let signal = WorkflowSignal {
            topic,
            entity_kind: Resource::Submission,
            entity_id: submission.id.0.clone(),
            status: submission.status.label(),
        };
        if let Err(err) = self.notifications.publish(signal) {
            tracing::warn!(%err, submission = %submission.id.0, "notification dispatch failed");
        }
    }
}

/// Checklist progress snapshot for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationProgress {
    pub subject: ActorId,
    pub total_steps: usize,
    pub completed_steps: usize,
    pub fully_verified: bool,
    pub steps: Vec<super::domain::SubmissionView>,
}
