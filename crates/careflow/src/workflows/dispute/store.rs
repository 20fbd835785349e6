use crate::access::ActorId;
use crate::audit::AuditEntry;
use crate::workflows::error::StoreError;

use super::domain::{Dispute, DisputeId, JobId};

/// Storage abstraction for disputes.
///
/// Same atomicity contract as the submission store: record plus audit entry
/// commit together or not at all, and `save` enforces optimistic
/// versioning. `insert` must reject a second open dispute for the same
/// (job, raised_by, against) triple with `StoreError::Duplicate`.
pub trait DisputeStore: Send + Sync {
    fn insert(&self, dispute: Dispute, audit: AuditEntry) -> Result<Dispute, StoreError>;

    fn load(&self, id: &DisputeId) -> Result<Option<Dispute>, StoreError>;

    fn save(
        &self,
        dispute: Dispute,
        expected_version: u64,
        audit: AuditEntry,
    ) -> Result<Dispute, StoreError>;

    /// The open (non-resolved, non-closed) dispute for a triple, if any.
    fn find_open(
        &self,
        job_id: &JobId,
        raised_by: &ActorId,
        against: &ActorId,
    ) -> Result<Option<Dispute>, StoreError>;
}
