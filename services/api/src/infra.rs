use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use careflow::access::{ActorId, AuthenticationError, Identity, IdentityResolver, Role};
use careflow::audit::{AuditEntry, AuditError, AuditSink};
use careflow::workflows::dispute::{Dispute, DisputeId, DisputeStore, JobId};
use careflow::workflows::submission::{Submission, SubmissionId, SubmissionStore, SubmissionType};
use careflow::workflows::{NotificationPublisher, NotifyError, StoreError, WorkflowSignal};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Append-only in-memory audit trail backing the stores and the gate.
#[derive(Default)]
pub(crate) struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub(crate) fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().expect("audit mutex poisoned").clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn append(&self, entry: AuditEntry) -> Result<(), AuditError> {
        self.entries
            .lock()
            .expect("audit mutex poisoned")
            .push(entry);
        Ok(())
    }
}

/// In-memory submission store. Commits the record and its audit entry under
/// one lock and enforces optimistic versioning.
pub(crate) struct MemorySubmissionStore {
    records: Mutex<HashMap<SubmissionId, Submission>>,
    audit: Arc<MemoryAuditSink>,
}

impl MemorySubmissionStore {
    pub(crate) fn with_sink(audit: Arc<MemoryAuditSink>) -> Self {
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

/// In-memory dispute store with the one-open-dispute-per-triple guard.
pub(crate) struct MemoryDisputeStore {
    records: Mutex<HashMap<DisputeId, Dispute>>,
    audit: Arc<MemoryAuditSink>,
}

impl MemoryDisputeStore {
    pub(crate) fn with_sink(audit: Arc<MemoryAuditSink>) -> Self {
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

/// Records workflow signals and traces them for operators. Stands in for
/// the real notification channels (SMS, e-mail, dashboards).
#[derive(Default)]
pub(crate) struct MemoryNotificationPublisher {
    events: Mutex<Vec<WorkflowSignal>>,
}

impl MemoryNotificationPublisher {
    pub(crate) fn events(&self) -> Vec<WorkflowSignal> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationPublisher for MemoryNotificationPublisher {
    fn publish(&self, signal: WorkflowSignal) -> Result<(), NotifyError> {
        tracing::info!(
            topic = signal.topic,
            entity = %signal.entity_id,
            status = signal.status,
            "workflow signal dispatched"
        );
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(signal);
        Ok(())
    }
}

/// Token-to-identity directory standing in for the external identity
/// provider consumed at the request boundary.
pub(crate) struct StaticIdentityDirectory {
    identities: HashMap<String, Identity>,
}

impl StaticIdentityDirectory {
    pub(crate) fn seeded() -> Self {
        let identities = [
            ("tok-super-admin", Identity::new("root-1", Role::SuperAdmin)),
            ("tok-admin", Identity::new("admin-1", Role::Admin)),
            ("tok-moderator", Identity::new("mod-1", Role::Moderator)),
            (
                "tok-agency",
                Identity::new("agency-1", Role::Agency).with_links(["cg-1", "cg-2"]),
            ),
            ("tok-caregiver", Identity::new("cg-1", Role::Caregiver)),
            (
                "tok-guardian",
                Identity::new("guardian-1", Role::Guardian).with_links(["patient-1"]),
            ),
            ("tok-shop", Identity::new("shop-1", Role::Shop)),
        ]
        .into_iter()
        .map(|(token, identity)| (token.to_string(), identity))
        .collect();
        Self { identities }
    }
}

impl IdentityResolver for StaticIdentityDirectory {
    fn resolve(&self, credential: &str) -> Result<Identity, AuthenticationError> {
        self.identities
            .get(credential)
            .cloned()
            .ok_or(AuthenticationError)
    }
}
