use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::access::{
    ActorId, AuthenticationError, AuthorizationGate, Identity, IdentityResolver, PermissionMatrix,
    Role,
};
use crate::audit::{AuditEntry, AuditError, AuditSink};
use crate::config::PolicyConfig;
use crate::workflows::dispute::domain::{Dispute, DisputeId, DisputeType, JobId};
use crate::workflows::dispute::router::{dispute_router, DisputeRouterState};
use crate::workflows::dispute::service::{DisputeWorkflow, RaiseDisputeRequest};
use crate::workflows::dispute::store::DisputeStore;
use crate::workflows::error::StoreError;
use crate::workflows::lock::EntityLocks;
use crate::workflows::notify::{NotificationPublisher, NotifyError, WorkflowSignal};

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
/// lock, with optimistic version checks and the open-triple guard.
pub(super) struct MemoryDisputeStore {
    records: Mutex<HashMap<DisputeId, Dispute>>,
    audit: Arc<MemoryAuditSink>,
}

impl MemoryDisputeStore {
    pub(super) fn with_sink(audit: Arc<MemoryAuditSink>) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            audit,
        }
    }
}

impl DisputeStore for MemoryDisputeStore {
    fn insert(&self, dispute: Dispute, audit: AuditEntry) -> Result<Dispute, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let open_twin = guard.values().any(|existing| {
            existing.job_id == dispute.job_id
                && existing.raised_by == dispute.raised_by
                && existing.against == dispute.against
                && existing.status.is_open()
        });
        if open_twin || guard.contains_key(&dispute.id) {
            return Err(StoreError::Duplicate);
        }
        self.audit
            .append(audit)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        guard.insert(dispute.id.clone(), dispute.clone());
        Ok(dispute)
    }

    fn load(&self, id: &DisputeId) -> Result<Option<Dispute>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(
        &self,
        mut dispute: Dispute,
        expected_version: u64,
        audit: AuditEntry,
    ) -> Result<Dispute, StoreError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        let current = guard.get(&dispute.id).ok_or(StoreError::NotFound)?;
        if current.version != expected_version {
            return Err(StoreError::StaleVersion);
        }
        self.audit
            .append(audit)
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        dispute.version = expected_version + 1;
        guard.insert(dispute.id.clone(), dispute.clone());
        Ok(dispute)
    }

    fn find_open(
        &self,
        job_id: &JobId,
        raised_by: &ActorId,
        against: &ActorId,
    ) -> Result<Option<Dispute>, StoreError> {
        let guard = self.records.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .find(|dispute| {
                dispute.job_id == *job_id
                    && dispute.raised_by == *raised_by
                    && dispute.against == *against
                    && dispute.status.is_open()
            })
            .cloned())
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

pub(super) fn admin() -> Identity {
    Identity::new("admin-1", Role::Admin)
}

pub(super) fn guardian() -> Identity {
    Identity::new("guardian-1", Role::Guardian).with_links(["patient-1"])
}

pub(super) fn caregiver() -> Identity {
    Identity::new("cg-1", Role::Caregiver)
}

pub(super) fn agency() -> Identity {
    Identity::new("agency-1", Role::Agency).with_links(["cg-1"])
}

pub(super) fn shop() -> Identity {
    Identity::new("shop-1", Role::Shop)
}

pub(super) fn raise_request(dispute_type: DisputeType) -> RaiseDisputeRequest {
    RaiseDisputeRequest {
        job_id: JobId("job-1".to_string()),
        against: ActorId::new("cg-1"),
        dispute_type,
        description: "caregiver arrived two hours late".to_string(),
        evidence_refs: vec!["s3://evidence/photo.jpg".to_string()],
    }
}

pub(super) struct Harness {
    pub(super) workflow: Arc<DisputeWorkflow<MemoryDisputeStore, MemoryNotifier>>,
    pub(super) sink: Arc<MemoryAuditSink>,
    pub(super) notifier: Arc<MemoryNotifier>,
}

pub(super) fn build_workflow() -> Harness {
    let sink = Arc::new(MemoryAuditSink::default());
    let store = Arc::new(MemoryDisputeStore::with_sink(sink.clone()));
    let notifier = Arc::new(MemoryNotifier::default());
    let gate = Arc::new(AuthorizationGate::new(
        PermissionMatrix::marketplace_defaults(),
        sink.clone(),
    ));
    let workflow = Arc::new(DisputeWorkflow::new(
        gate,
        store,
        notifier.clone(),
        Arc::new(EntityLocks::default()),
        PolicyConfig::default(),
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
            ("tok-guardian", guardian()),
            ("tok-caregiver", caregiver()),
            ("tok-agency", agency()),
            ("tok-shop", shop()),
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
    dispute_router(DisputeRouterState {
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
