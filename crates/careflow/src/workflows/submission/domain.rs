use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ActorId, Role};
use crate::workflows::error::WorkflowError;

/// Identifier wrapper for verification submissions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub String);

/// Verification artifacts the platform reviews before activating an
/// agency or caregiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    AgencyLegalDocs,
    AgencyPhysical,
    CaregiverCertificate,
    CaregiverPoliceClearance,
    CaregiverInterview,
    CaregiverPsych,
}

impl SubmissionType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::AgencyLegalDocs => "agency_legal_docs",
            Self::AgencyPhysical => "agency_physical",
            Self::CaregiverCertificate => "caregiver_certificate",
            Self::CaregiverPoliceClearance => "caregiver_police_clearance",
            Self::CaregiverInterview => "caregiver_interview",
            Self::CaregiverPsych => "caregiver_psych",
        }
    }

    /// The role whose verification pipeline this artifact belongs to.
    pub const fn audience(self) -> Role {
        match self {
            Self::AgencyLegalDocs | Self::AgencyPhysical => Role::Agency,
            Self::CaregiverCertificate
            | Self::CaregiverPoliceClearance
            | Self::CaregiverInterview
            | Self::CaregiverPsych => Role::Caregiver,
        }
    }

    /// Full checklist a role must clear to become verified.
    pub const fn required_for(role: Role) -> &'static [SubmissionType] {
        match role {
            Role::Agency => &[Self::AgencyLegalDocs, Self::AgencyPhysical],
            Role::Caregiver => &[
                Self::CaregiverCertificate,
                Self::CaregiverPoliceClearance,
                Self::CaregiverInterview,
                Self::CaregiverPsych,
            ],
            _ => &[],
        }
    }
}

/// Lifecycle status of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    ModeratorReviewed,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ModeratorReviewed => "moderator_reviewed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// First-tier verdict. The moderator recommends; only an admin finalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Reject,
}

impl Recommendation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Second-tier ruling. Binding, and free to contradict the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminDecision {
    Approve,
    SendBack,
    OverrideReject,
}

impl AdminDecision {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::SendBack => "send_back",
            Self::OverrideReject => "override_reject",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratorReview {
    pub moderator: ActorId,
    pub recommendation: Recommendation,
    pub notes: Option<String>,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRuling {
    pub admin: ActorId,
    pub decision: AdminDecision,
    pub feedback: Option<String>,
    pub decided_at: DateTime<Utc>,
}

/// A verification artifact under review.
///
/// A submission carries at most one active lifecycle: a send-back returns
/// the same record to `Pending` with the review cycle incremented rather
/// than spawning a new entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub submission_type: SubmissionType,
    pub submitter: ActorId,
    pub status: SubmissionStatus,
    pub review_cycle: u32,
    /// Assigned first-tier reviewer. Set by the first recommendation.
    pub moderator: Option<ActorId>,
    pub moderator_review: Option<ModeratorReview>,
    pub admin_ruling: Option<AdminRuling>,
    pub document_refs: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Submission {
    pub fn new(
        id: SubmissionId,
        submission_type: SubmissionType,
        submitter: ActorId,
        document_refs: Vec<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            submission_type,
            submitter,
            status: SubmissionStatus::Pending,
            review_cycle: 0,
            moderator: None,
            moderator_review: None,
            admin_ruling: None,
            document_refs,
            submitted_at: at,
            updated_at: at,
            version: 0,
        }
    }

    /// Replace the artifact documents while the review pass is still open.
    pub fn refresh_documents(
        &mut self,
        document_refs: Vec<String>,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != SubmissionStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        self.document_refs = document_refs;
        self.updated_at = at;
        Ok(())
    }

    /// Apply the first-tier recommendation: Pending -> ModeratorReviewed.
    ///
    /// Notes are optional on approve and mandatory on reject.
    pub fn record_recommendation(
        &mut self,
        moderator: ActorId,
        recommendation: Recommendation,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != SubmissionStatus::Pending {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        let notes = normalize(notes);
        if recommendation == Recommendation::Reject && notes.is_none() {
            return Err(WorkflowError::Validation { field: "notes" });
        }

        self.moderator = Some(moderator.clone());
        self.moderator_review = Some(ModeratorReview {
            moderator,
            recommendation,
            notes,
            reviewed_at: at,
        });
        self.status = SubmissionStatus::ModeratorReviewed;
        self.updated_at = at;
        Ok(())
    }

    /// Apply the binding second-tier ruling: ModeratorReviewed ->
    /// {Approved, Rejected, Pending}.
    ///
    /// Feedback is mandatory and non-blank for send-back and override so
    /// the moderator always receives actionable guidance. No ruling is
    /// possible before a recommendation exists.
    pub fn apply_decision(
        &mut self,
        admin: ActorId,
        decision: AdminDecision,
        feedback: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status != SubmissionStatus::ModeratorReviewed {
            return Err(WorkflowError::InvalidTransition {
                current: self.status.label(),
            });
        }
        let feedback = normalize(feedback);
        if decision != AdminDecision::Approve && feedback.is_none() {
            return Err(WorkflowError::Validation { field: "feedback" });
        }

        self.admin_ruling = Some(AdminRuling {
            admin,
            decision,
            feedback,
            decided_at: at,
        });
        self.status = match decision {
            AdminDecision::Approve => SubmissionStatus::Approved,
            AdminDecision::OverrideReject => SubmissionStatus::Rejected,
            AdminDecision::SendBack => {
                self.review_cycle += 1;
                self.moderator_review = None;
                SubmissionStatus::Pending
            }
        };
        self.updated_at = at;
        Ok(())
    }

    pub fn status_view(&self) -> SubmissionView {
        SubmissionView {
            submission_id: self.id.clone(),
            submission_type: self.submission_type.label(),
            status: self.status.label(),
            review_cycle: self.review_cycle,
            moderator: self.moderator.clone(),
            recommendation: self
                .moderator_review
                .as_ref()
                .map(|review| review.recommendation.label()),
            moderator_notes: self
                .moderator_review
                .as_ref()
                .and_then(|review| review.notes.clone()),
            decision: self
                .admin_ruling
                .as_ref()
                .map(|ruling| ruling.decision.label()),
            feedback: self
                .admin_ruling
                .as_ref()
                .and_then(|ruling| ruling.feedback.clone()),
            submitted_at: self.submitted_at,
            updated_at: self.updated_at,
        }
    }
}

fn normalize(text: Option<String>) -> Option<String> {
    text.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Sanitized representation of a submission's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub submission_id: SubmissionId,
    pub submission_type: &'static str,
    pub status: &'static str,
    pub review_cycle: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator: Option<ActorId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moderator_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
