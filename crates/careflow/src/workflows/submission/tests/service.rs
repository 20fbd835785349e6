use chrono::Utc;

use super::common::*;
use crate::access::DenyReason;
use crate::workflows::error::WorkflowError;
use crate::workflows::submission::domain::{
    AdminDecision, Recommendation, SubmissionStatus, SubmissionType,
};

#[test]
fn submit_opens_a_pending_pass_and_audits_it() {
    let harness = build_workflow();

    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverCertificate,
            vec!["s3://docs/cert.pdf".to_string()],
            Utc::now(),
        )
        .expect("submission accepted");

    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(submission.review_cycle, 0);

    let entries = harness.sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "submission_submit");
    assert_eq!(entries[0].new_status, Some("pending"));
}

#[test]
fn submit_rejects_an_artifact_outside_the_submitter_pipeline() {
    let harness = build_workflow();

    let err = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::AgencyLegalDocs,
            Vec::new(),
            Utc::now(),
        )
        .expect_err("caregiver cannot lodge agency paperwork");
    assert!(matches!(
        err,
        WorkflowError::Validation {
            field: "submission_type"
        }
    ));
}

#[test]
fn guardian_submission_is_denied_by_the_matrix() {
    let harness = build_workflow();

    let err = harness
        .workflow
        .submit(
            &guardian(),
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect_err("guardians hold no submission grant");
    assert!(matches!(
        err,
        WorkflowError::Forbidden(DenyReason::InsufficientRole)
    ));
    assert_eq!(harness.sink.entries()[0].reason, Some("insufficient-role"));
}

#[test]
fn resubmit_refreshes_documents_on_the_open_pass() {
    let harness = build_workflow();
    let actor = caregiver();

    let first = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverCertificate,
            vec!["v1.pdf".to_string()],
            Utc::now(),
        )
        .expect("first submission");
    let second = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverCertificate,
            vec!["v2.pdf".to_string()],
            Utc::now(),
        )
        .expect("resubmission refreshes");

    assert_eq!(first.id, second.id, "no second lifecycle is spawned");
    assert_eq!(second.document_refs, vec!["v2.pdf".to_string()]);
}

#[test]
fn recommend_requires_the_moderator_tier() {
    let harness = build_workflow();
    let actor = caregiver();
    let submission = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");

    let err = harness
        .workflow
        .recommend(
            &submission.id,
            &actor,
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect_err("submitters cannot review themselves");
    assert!(matches!(
        err,
        WorkflowError::Forbidden(DenyReason::InsufficientRole)
    ));
}

#[test]
fn later_review_passes_stay_with_the_assigned_moderator() {
    let harness = build_workflow();
    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");

    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Reject,
            Some("photo blurry".to_string()),
            Utc::now(),
        )
        .expect("first recommendation assigns mod-1");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::SendBack,
            Some("ask for new photo".to_string()),
            Utc::now(),
        )
        .expect("send back reopens the pass");

    let err = harness
        .workflow
        .recommend(
            &submission.id,
            &second_moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect_err("unassigned moderator is rejected");
    assert!(matches!(
        err,
        WorkflowError::Forbidden(DenyReason::NotAssigned)
    ));

    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("assignee continues the review");
}

#[test]
fn decide_requires_the_admin_tier() {
    let harness = build_workflow();
    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("recommendation");

    let err = harness
        .workflow
        .decide(
            &submission.id,
            &moderator(),
            AdminDecision::Approve,
            None,
            Utc::now(),
        )
        .expect_err("moderators cannot finalize");
    assert!(matches!(
        err,
        WorkflowError::Forbidden(DenyReason::InsufficientRole)
    ));
}

#[test]
fn terminal_decisions_and_send_backs_emit_signals() {
    let harness = build_workflow();
    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverPoliceClearance,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Reject,
            Some("expired".to_string()),
            Utc::now(),
        )
        .expect("recommendation");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::SendBack,
            Some("request a current clearance".to_string()),
            Utc::now(),
        )
        .expect("send back");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("second pass");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::Approve,
            None,
            Utc::now(),
        )
        .expect("approval");

    let topics: Vec<&'static str> = harness
        .notifier
        .events()
        .iter()
        .map(|signal| signal.topic)
        .collect();
    assert_eq!(topics, vec!["submission.sent_back", "submission.approved"]);
}

#[test]
fn approved_artifacts_cannot_be_resubmitted() {
    let harness = build_workflow();
    let actor = caregiver();
    let submission = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverInterview,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("recommendation");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::Approve,
            None,
            Utc::now(),
        )
        .expect("approval");

    let err = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverInterview,
            Vec::new(),
            Utc::now(),
        )
        .expect_err("approved steps are final");
    assert!(matches!(
        err,
        WorkflowError::InvalidTransition { current: "approved" }
    ));
}

#[test]
fn rejection_starts_a_fresh_record_on_resubmission() {
    let harness = build_workflow();
    let actor = caregiver();
    let submission = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverPsych,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Reject,
            Some("incomplete".to_string()),
            Utc::now(),
        )
        .expect("recommendation");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::OverrideReject,
            Some("assessment invalid".to_string()),
            Utc::now(),
        )
        .expect("rejection");

    let fresh = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverPsych,
            Vec::new(),
            Utc::now(),
        )
        .expect("a rejected artifact can be tried again");
    assert_ne!(fresh.id, submission.id);
    assert_eq!(fresh.status, SubmissionStatus::Pending);
}

#[test]
fn agency_reads_linked_caregiver_submissions() {
    let harness = build_workflow();
    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");

    harness
        .workflow
        .get(&submission.id, &agency())
        .expect("agency is linked to cg-1");

    let err = harness
        .workflow
        .get(&submission.id, &guardian())
        .expect_err("guardians are not party to verification");
    assert!(matches!(err, WorkflowError::Forbidden(_)));
}

#[test]
fn verification_progress_tracks_the_role_checklist() {
    let harness = build_workflow();
    let actor = caregiver();
    let submission = harness
        .workflow
        .submit(
            &actor,
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("recommendation");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::Approve,
            None,
            Utc::now(),
        )
        .expect("approval");

    let progress = harness
        .workflow
        .verification_progress(&moderator(), &actor.id, actor.role)
        .expect("moderators read any progress");
    assert_eq!(progress.total_steps, 4);
    assert_eq!(progress.completed_steps, 1);
    assert!(!progress.fully_verified);
}

#[test]
fn transition_audit_trail_captures_prior_and_new_status() {
    let harness = build_workflow();
    let submission = harness
        .workflow
        .submit(
            &caregiver(),
            SubmissionType::CaregiverCertificate,
            Vec::new(),
            Utc::now(),
        )
        .expect("submission");
    harness
        .workflow
        .recommend(
            &submission.id,
            &moderator(),
            Recommendation::Approve,
            None,
            Utc::now(),
        )
        .expect("recommendation");
    harness
        .workflow
        .decide(
            &submission.id,
            &admin(),
            AdminDecision::OverrideReject,
            Some("docs expired".to_string()),
            Utc::now(),
        )
        .expect("override");

    let entries = harness.sink.entries();
    let override_entry = entries
        .iter()
        .find(|entry| entry.action == "admin_override_reject")
        .expect("override audited");
    assert_eq!(override_entry.prior_status, Some("moderator_reviewed"));
    assert_eq!(override_entry.new_status, Some("rejected"));
    assert_eq!(override_entry.actor.0, "admin-1");
}
