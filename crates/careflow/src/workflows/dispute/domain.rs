use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::access::ActorId;
use crate::workflows::error::WorkflowError;

/// Identifier wrapper for disputes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisputeId(pub String);

/// Identifier wrapper for the job a dispute is attached to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

/// Dispute categories. Severity is a static classification of the type,
/// never supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeType {
    Payment,
    ServiceQuality,
    Behavior,
    Scheduling,
}

impl DisputeType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::ServiceQuality => "service_quality",
            Self::Behavior => "behavior",
            Self::Scheduling => "scheduling",
        }
    }

    pub const fn severity(self) -> DisputeSeverity {
        match self {
            Self::Payment => DisputeSeverity::Urgent,
            Self::Behavior => DisputeSeverity::High,
            Self::ServiceQuality => DisputeSeverity::Medium,
            Self::Scheduling => DisputeSeverity::Low,
        }
    }

    pub const fn is_payment(self) -> bool {
        matches!(self, Self::Payment)
    }
}

impl fmt::Display for DisputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeSeverity {
    Low,
    Medium,
    High,
    Urgent,
}

impl DisputeSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// High and urgent disputes are outside moderator authority.
    pub const fn requires_escalation(self) -> bool {
        matches!(self, Self::High | Self::Urgent)
    }
}

/// Lifecycle status of a dispute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    Open,
    UnderModeratorReview,
    Escalated,
    Resolved,
    Closed,
}

impl DisputeStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::UnderModeratorReview => "under_moderator_review",
            Self::Escalated => "escalated",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }

    /// Open for the one-dispute-per-triple invariant: everything before
    /// resolution counts.
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Resolved | Self::Closed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_by: ActorId,
    pub summary: String,
    pub resolved_at: DateTime<Utc>,
}

/// A user-raised dispute between two marketplace parties over a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub id: DisputeId,
    pub job_id: JobId,
    pub raised_by: ActorId,
    pub against: ActorId,
    pub dispute_type: DisputeType,
    pub description: String,
    pub evidence_refs: Vec<String>,
    pub status: DisputeStatus,
    pub moderator: Option<ActorId>,
    pub moderator_notes: Option<String>,
    pub escalated_at: Option<DateTime<Utc>>,
    pub resolution: Option<Resolution>,
    /// Cooling-off deadline for payment disputes. Funds stay held until
    /// the dispute is resolved AND this instant has passed.
    pub escrow_hold_until: Option<DateTime<Utc>>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Dispute {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: DisputeId,
        job_id: JobId,
        raised_by: ActorId,
        against: ActorId,
        dispute_type: DisputeType,
        description: String,
        evidence_refs: Vec<String>,
        escrow_hold: Duration,
        at: DateTime<Utc>,
    ) -> Self {
        let escrow_hold_until = dispute_type.is_payment().then(|| at + escrow_hold);
        Self {
            id,
            job_id,
            raised_by,
            against,
            dispute_type,
            description,
            evidence_refs,
            status: DisputeStatus::Open,
            moderator: None,
            moderator_notes: None,
            escalated_at: None,
            resolution: None,
            escrow_hold_until,
            opened_at: at,
            updated_at: at,
            version: 0,
        }
    }

    /// Open -> UnderModeratorReview.
    pub fn assign_moderator(
        &mut self,
        moderator: ActorId,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != DisputeStatus::Open {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        self.moderator = Some(moderator);
        self.status = DisputeStatus::UnderModeratorReview;
        self.updated_at = at;
        Ok(())
    }

    /// Moderator-authority resolution, permitted only for low/medium
    /// severity types. UnderModeratorReview -> Resolved.
    pub fn resolve_by_moderator(
        &mut self,
        moderator: ActorId,
        summary: String,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != DisputeStatus::UnderModeratorReview {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        if self.dispute_type.severity().requires_escalation() {
            return Err(WorkflowError::EscalationRequired {
                dispute_type: self.dispute_type,
            });
        }
        self.record_resolution(moderator, summary, at)
    }

    /// UnderModeratorReview -> Escalated. Notes mandatory.
    pub fn escalate(&mut self, notes: String, at: DateTime<Utc>) -> Result<(), WorkflowError> {
        if self.status != DisputeStatus::UnderModeratorReview {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        let notes = notes.trim();
        if notes.is_empty() {
            return Err(WorkflowError::Validation { field: "notes" });
        }
        self.moderator_notes = Some(notes.to_string());
        self.escalated_at = Some(at);
        self.status = DisputeStatus::Escalated;
        self.updated_at = at;
        Ok(())
    }

    /// Escalated -> Resolved, admin authority.
    pub fn resolve_by_admin(
        &mut self,
        admin: ActorId,
        summary: String,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != DisputeStatus::Escalated {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        self.record_resolution(admin, summary, at)
    }

    /// Resolved -> Closed. Idempotent: closing a closed dispute is a no-op
    /// so the appeal-inspection window can end more than once safely.
    pub fn close(&mut self, at: DateTime<Utc>) -> Result<bool, WorkflowError> {
        match self.status {
            DisputeStatus::Closed => Ok(false),
            DisputeStatus::Resolved => {
                self.status = DisputeStatus::Closed;
                self.updated_at = at;
                Ok(true)
            }
            other => Err(WorkflowError::InvalidTransition {
                current: other.label(),
            }),
        }
    }

    /// The escrow gate: disputed funds may move only once the dispute has
    /// reached resolution AND the cooling-off deadline has passed. Both
    /// conditions; a fast resolve never shortcuts the hold.
    pub fn funds_releasable(&self, now: DateTime<Utc>) -> bool {
        let resolved = matches!(self.status, DisputeStatus::Resolved | DisputeStatus::Closed);
        let hold_elapsed = self
            .escrow_hold_until
            .map_or(true, |deadline| now >= deadline);
        resolved && hold_elapsed
    }

    fn record_resolution(
        &mut self,
        resolved_by: ActorId,
        summary: String,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(WorkflowError::Validation {
                field: "resolution",
            });
        }
        self.resolution = Some(Resolution {
            resolved_by,
            summary: summary.to_string(),
            resolved_at: at,
        });
        self.status = DisputeStatus::Resolved;
        self.updated_at = at;
        Ok(())
    }

    pub fn status_view(&self) -> DisputeView {
        DisputeView {
            dispute_id: self.id.clone(),
            job_id: self.job_id.clone(),
            dispute_type: self.dispute_type.label(),
            severity: self.dispute_type.severity().label(),
            status: self.status.label(),
            raised_by: self.raised_by.clone(),
            against: self.against.clone(),
            moderator: self.moderator.clone(),
            escalated_at: self.escalated_at,
            resolution: self
                .resolution
                .as_ref()
                .map(|resolution| resolution.summary.clone()),
            escrow_hold_until: self.escrow_hold_until,
            opened_at: self.opened_at,
            updated_at: self.updated_at,
        }
    }
}

/// Sanitized representation of a dispute's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct DisputeView {
    pub dispute_id: DisputeId,
    pub job_id: JobId,
    pub dispute_type: &'static str,
    pub severity: &'static str,
    pub status: &'static str,
    pub raised_by: ActorId,
    pub against: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escrow_hold_until: Option<DateTime<Utc>>,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dispute(dispute_type: DisputeType) -> Dispute {
        Dispute::open(
            DisputeId("disp-1".to_string()),
            JobId("job-1".to_string()),
            ActorId::new("guardian-1"),
            ActorId::new("cg-1"),
            dispute_type,
            "caregiver arrived late".to_string(),
            Vec::new(),
            Duration::hours(48),
            Utc::now(),
        )
    }

    #[test]
    fn payment_disputes_open_with_an_escrow_hold() {
        let subject = dispute(DisputeType::Payment);
        let deadline = subject.escrow_hold_until.expect("hold is set");
        assert_eq!(deadline, subject.opened_at + Duration::hours(48));

        assert!(dispute(DisputeType::Behavior).escrow_hold_until.is_none());
    }

    #[test]
    fn moderator_cannot_resolve_high_severity_types() {
        for dispute_type in [DisputeType::Payment, DisputeType::Behavior] {
            let mut subject = dispute(dispute_type);
            subject
                .assign_moderator(ActorId::new("mod-1"), Utc::now())
                .expect("assignment");
            let err = subject
                .resolve_by_moderator(ActorId::new("mod-1"), "settled".to_string(), Utc::now())
                .expect_err("must escalate");
            assert!(matches!(err, WorkflowError::EscalationRequired { .. }));
            assert_eq!(subject.status, DisputeStatus::UnderModeratorReview);
        }
    }

    #[test]
    fn moderator_resolves_low_severity_types() {
        let mut subject = dispute(DisputeType::Scheduling);
        subject
            .assign_moderator(ActorId::new("mod-1"), Utc::now())
            .expect("assignment");
        subject
            .resolve_by_moderator(ActorId::new("mod-1"), "rescheduled".to_string(), Utc::now())
            .expect("moderator authority suffices");
        assert_eq!(subject.status, DisputeStatus::Resolved);
    }

    #[test]
    fn escalation_requires_notes() {
        let mut subject = dispute(DisputeType::Payment);
        subject
            .assign_moderator(ActorId::new("mod-1"), Utc::now())
            .expect("assignment");
        let err = subject
            .escalate("  ".to_string(), Utc::now())
            .expect_err("blank notes rejected");
        assert!(matches!(err, WorkflowError::Validation { field: "notes" }));
    }

    #[test]
    fn admin_resolution_only_from_escalated() {
        let mut subject = dispute(DisputeType::Payment);
        let err = subject
            .resolve_by_admin(ActorId::new("admin-1"), "refunded".to_string(), Utc::now())
            .expect_err("open disputes cannot be admin-resolved");
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
    }

    #[test]
    fn close_is_idempotent() {
        let mut subject = dispute(DisputeType::Scheduling);
        subject
            .assign_moderator(ActorId::new("mod-1"), Utc::now())
            .expect("assignment");
        subject
            .resolve_by_moderator(ActorId::new("mod-1"), "rescheduled".to_string(), Utc::now())
            .expect("resolution");

        assert!(subject.close(Utc::now()).expect("close applies"));
        assert!(!subject.close(Utc::now()).expect("second close is a no-op"));
        assert_eq!(subject.status, DisputeStatus::Closed);
    }

    #[test]
    fn funds_stay_held_until_both_conditions_are_met() {
        let t0 = Utc::now();
        let mut subject = Dispute::open(
            DisputeId("disp-pay".to_string()),
            JobId("job-1".to_string()),
            ActorId::new("guardian-1"),
            ActorId::new("agency-1"),
            DisputeType::Payment,
            "double charge".to_string(),
            Vec::new(),
            Duration::hours(48),
            t0,
        );

        subject
            .assign_moderator(ActorId::new("mod-1"), t0 + Duration::hours(1))
            .expect("assignment");
        subject
            .escalate("payment issue".to_string(), t0 + Duration::hours(2))
            .expect("escalation");

        // Not yet resolved: held even after the deadline.
        assert!(!subject.funds_releasable(t0 + Duration::hours(72)));

        subject
            .resolve_by_admin(
                ActorId::new("admin-1"),
                "refund issued".to_string(),
                t0 + Duration::hours(10),
            )
            .expect("resolution");

        // Resolved early: held until the deadline passes.
        assert!(!subject.funds_releasable(t0 + Duration::hours(10)));
        assert!(!subject.funds_releasable(t0 + Duration::hours(47)));
        assert!(subject.funds_releasable(t0 + Duration::hours(48)));
    }
}
