use std::sync::Arc;

use careflow::access::{ActorId, AuthorizationGate, Identity, PermissionMatrix, Role};
use careflow::config::PolicyConfig;
use careflow::error::AppError;
use careflow::workflows::dispute::{DisputeType, DisputeWorkflow, JobId, RaiseDisputeRequest};
use careflow::workflows::submission::{
    AdminDecision, Recommendation, SubmissionType, SubmissionWorkflow,
};
use careflow::workflows::{EntityLocks, WorkflowError};
use chrono::{Duration, Utc};
use clap::Args;

use crate::infra::{
    MemoryAuditSink, MemoryDisputeStore, MemoryNotificationPublisher, MemorySubmissionStore,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Escrow hold window in hours for the dispute portion of the demo.
    #[arg(long)]
    pub(crate) escrow_hold_hours: Option<u32>,
    /// Skip the dispute portion of the demo.
    #[arg(long)]
    pub(crate) skip_disputes: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut policy = PolicyConfig::default();
    if let Some(hours) = args.escrow_hold_hours {
        policy.escrow_hold_hours = hours;
    }

    let audit = Arc::new(MemoryAuditSink::default());
    let gate = Arc::new(AuthorizationGate::new(
        PermissionMatrix::marketplace_defaults(),
        audit.clone(),
    ));
    let locks = Arc::new(EntityLocks::new(policy.lock_wait()));
    let notifications = Arc::new(MemoryNotificationPublisher::default());
    let submissions = SubmissionWorkflow::new(
        gate.clone(),
        Arc::new(MemorySubmissionStore::with_sink(audit.clone())),
        notifications.clone(),
        locks.clone(),
    );
    let disputes = DisputeWorkflow::new(
        gate,
        Arc::new(MemoryDisputeStore::with_sink(audit.clone())),
        notifications.clone(),
        locks,
        policy,
    );

    let caregiver = Identity::new("cg-100", Role::Caregiver);
    let guardian = Identity::new("guardian-7", Role::Guardian).with_links(["patient-3"]);
    let moderator = Identity::new("mod-1", Role::Moderator);
    let admin = Identity::new("admin-1", Role::Admin);

    println!("Careflow moderation demo");

    println!("\nVerification review");
    let now = Utc::now();
    let submission = submissions.submit(
        &caregiver,
        SubmissionType::CaregiverCertificate,
        vec!["s3://docs/certificate.pdf".to_string()],
        now,
    )?;
    println!(
        "- {} lodged a {} submission -> {}",
        caregiver.id.0,
        submission.submission_type.label(),
        submission.status.label()
    );

    let submission = submissions.recommend(
        &submission.id,
        &moderator,
        Recommendation::Reject,
        Some("scan is unreadable".to_string()),
        now,
    )?;
    println!(
        "- moderator recommended reject -> {}",
        submission.status.label()
    );

    let submission = submissions.decide(
        &submission.id,
        &admin,
        AdminDecision::SendBack,
        Some("ask for a readable scan".to_string()),
        now,
    )?;
    println!(
        "- admin sent it back for another pass (cycle {})",
        submission.review_cycle
    );

    let submission = submissions.recommend(
        &submission.id,
        &moderator,
        Recommendation::Approve,
        None,
        now,
    )?;
    let submission = submissions.decide(
        &submission.id,
        &admin,
        AdminDecision::OverrideReject,
        Some("certificate expired last month".to_string()),
        now,
    )?;
    println!(
        "- admin overrode the approve recommendation -> {}",
        submission.status.label()
    );

    let progress = submissions.verification_progress(&admin, &caregiver.id, caregiver.role)?;
    println!(
        "- verification progress for {}: {}/{} steps approved",
        caregiver.id.0, progress.completed_steps, progress.total_steps
    );

    if !args.skip_disputes {
        println!("\nDispute lifecycle");
        let raised = disputes.raise(
            &guardian,
            RaiseDisputeRequest {
                job_id: JobId("job-42".to_string()),
                against: ActorId::new("cg-100"),
                dispute_type: DisputeType::Payment,
                description: "charged twice for the same shift".to_string(),
                evidence_refs: vec!["s3://evidence/statement.pdf".to_string()],
            },
            now,
        )?;
        if let Some(deadline) = raised.escrow_hold_until {
            println!(
                "- payment dispute {} opened, escrow held until {}",
                raised.id.0,
                deadline.format("%Y-%m-%d %H:%M")
            );
        }

        disputes.assign(&raised.id, &moderator, now)?;
        disputes.escalate(
            &raised.id,
            &moderator,
            "refund exceeds moderator authority".to_string(),
            now,
        )?;
        let resolved_at = now + Duration::hours(10);
        disputes.resolve(
            &raised.id,
            &admin,
            "duplicate charge refunded".to_string(),
            resolved_at,
        )?;
        let early = disputes.escrow_state(&raised.id, &admin, resolved_at)?;
        println!(
            "- admin resolved after 10h, funds releasable: {}",
            early.releasable
        );
        let after_hold = now + policy.escrow_hold() + Duration::minutes(1);
        let late = disputes.escrow_state(&raised.id, &admin, after_hold)?;
        println!(
            "- once the {}h hold elapses, funds releasable: {}",
            policy.escrow_hold_hours, late.releasable
        );

        let behavior = disputes.raise(
            &guardian,
            RaiseDisputeRequest {
                job_id: JobId("job-43".to_string()),
                against: ActorId::new("cg-100"),
                dispute_type: DisputeType::Behavior,
                description: "caregiver was dismissive during handover".to_string(),
                evidence_refs: Vec::new(),
            },
            now,
        )?;
        disputes.assign(&behavior.id, &moderator, now)?;
        match disputes.resolve(
            &behavior.id,
            &moderator,
            "spoke with the caregiver".to_string(),
            now,
        ) {
            Err(err @ WorkflowError::EscalationRequired { .. }) => {
                println!("- moderator resolution refused: {err}");
            }
            Ok(dispute) => println!("- unexpected resolution: {}", dispute.status.label()),
            Err(err) => println!("- unexpected error: {err}"),
        }
    }

    let events = notifications.events();
    if events.is_empty() {
        println!("\nWorkflow signals: none dispatched");
    } else {
        println!("\nWorkflow signals");
        for signal in events {
            println!("- {} ({} -> {})", signal.topic, signal.entity_id, signal.status);
        }
    }

    println!("\nAudit trail");
    for entry in audit.entries() {
        let transition = match (entry.prior_status, entry.new_status) {
            (Some(prior), Some(new)) => format!("{prior} -> {new}"),
            (None, Some(new)) => format!("-> {new}"),
            _ => entry.reason.unwrap_or("-").to_string(),
        };
        println!(
            "- [{}] {} {} {}",
            entry.recorded_at.format("%H:%M:%S"),
            entry.actor.0,
            entry.action,
            transition
        );
    }

    Ok(())
}
