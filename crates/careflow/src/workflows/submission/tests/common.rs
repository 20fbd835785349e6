use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::access::{
    ActorId, AuthenticationError, AuthorizationGate, Identity, IdentityResolver, PermissionMatrix,
    Role,
};
use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::workflows::error::StoreError;
use crate::workflows::lock::EntityLocks;
use crate::workflows::notify::{NotificationPublisher, NotifyError, WorkflowSignal};
use crate::workflows::submission::domain::{Submission, SubmissionId, SubmissionType};
use crate::workflows::submission::router::{submission_router, SubmissionRouterState};
use crate::workflows::submission::service::SubmissionWorkflow;
use crate::workflows::submission::store::SubmissionStore;

#[derive(Default)]
pub(super) struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub(super) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries.lock().expect("audit mutex poisoned").push(entry);
        Ok(())
    }
}

/// In-memory store committing the record and its audit entry under one
/// lock, with optimistic version checks.
pub(super) struct MemorySubmissionStore {
    records: Mutex<HashMap<SubmissionId, Submission>>,
    audit: Arc<MemoryAuditSink>,
}

impl MemorySubmissionStore {
    pub(super) fn with_sink(audit: Arc<MemoryAuditSink>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            audit,
        }
    }
}

impl SubmissionStore for MemorySubmissionStore {
    fn insert(
        &self,
        submission: Submission,
        audit: AuditEntry,
    ) -> Result<Submission, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&submission.id) {
            return Err(StoreError::Duplicate);
        }
        self.audit
            .append(audit)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn load(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(
        &self,
        mut submission: Submission,
        expected_version: u64,
        audit: AuditEntry,
    ) -> Result<Submission, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let current = guard.get(&submission.id).ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::StaleVersion);
        }
        self.audit
            .append(audit)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        submission.version = expected_version + 1;
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    fn find_active(
        &self,
        submitter: &ActorId,
        submission_type: SubmissionType,
    ) -> Result<Option<Submission>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .find(|submission| {
                submission.submitter == *submitter
                    && submission.submission_type == submission_type
                    && !submission.status.is_terminal()
            })
            .cloned())
    }

    fn find_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Submission>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|submission| submission.submitter == *submitter)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    events: Mutex<Vec<WorkflowSignal>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<WorkflowSignal> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotifier {
    fn publish(&self, signal: WorkflowSignal) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(signal);
        Ok(())
    }
}

pub(super) fn moderator() -> Identity {
    Identity::new("mod-1", Role::Moderator)
}

pub(super) fn second_moderator() -> Identity {
    Identity::new("mod-2", Role::Moderator)
}

pub(super) fn admin() -> Identity {
    Identity::new("admin-1", Role::Admin)
}

pub(super) fn caregiver() -> Identity {
    Identity::new("cg-1", Role::Caregiver)
}

pub(super) fn agency() -> Identity {
    Identity::new("agency-1", Role::Agency).with_links(["cg-1"])
}

pub(super) fn guardian() -> Identity {
    Identity::new("guardian-1", Role::Guardian).with_links(["patient-1"])
}

pub(super) struct Harness {
    pub(super) workflow: Arc<SubmissionWorkflow<MemorySubmissionStore, MemoryNotifier>>,
    pub(super) sink: Arc<MemoryAuditSink>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

pub(super) fn build_workflow() -> Harness {
    let sink = Arc::new(MemoryAuditSink::default());
    let store = Arc::new(MemorySubmissionStore::with_sink(sink.clone()));
    let notifier = Arc::new(MemoryNotifier::default());
    let gate = Arc::new(AuthorizationGate::new(
        PermissionMatrix::marketplace_defaults(),
        sink.clone(),
    ));
    let workflow = Arc::new(SubmissionWorkflow::new(
        gate,
        store,
        notifier.clone(),
        Arc::new(EntityLocks::default()),
    ));
    Harness {
        workflow,
        sink,
        notifier,
    }
}

/// Token-to-identity map standing in for the external identity provider.
pub(super) struct StaticResolver {
    identities: HashMap<String, Identity>,
}

impl Default for StaticResolver {
    fn default() -> Self {
        let identities = [
            ("tok-moderator", moderator()),
            ("tok-admin", admin()),
            ("tok-caregiver", caregiver()),
            ("tok-agency", agency()),
            ("tok-guardian", guardian()),
        ]
        .into_iter()
        .map(|(token, identity)| (token.to_string(), identity))
        .collect();
        Self { identities }
    }
}

impl IdentityResolver for StaticResolver {
    fn resolve(&self, credential: &str) -> Result<Identity, AuthenticationError> {
        self.identities
            .get(credential)
            .cloned()
            .ok_or(AuthenticationError)
    }
}

pub(super) fn build_router(harness: &Harness) -> axum::Router {
    submission_router(SubmissionRouterState {
        service: harness.workflow.clone(),
        resolver: Arc::new(StaticResolver::default()),
    })
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
