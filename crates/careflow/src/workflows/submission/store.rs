use crate::access::ActorId;
use crate::audit::AuditEntry;
use crate::workflows::error::StoreError;

use super::domain::{Submission, SubmissionId, SubmissionType};

/// Storage abstraction for submissions.
///
/// Implementations must persist the record and append the audit entry
/// atomically: a transition is never recorded as applied without its audit
/// trail, and vice versa. `save` must reject a stale `expected_version`
/// with `StoreError::StaleVersion` and bump the stored version on success.
pub trait SubmissionStore: Send + Sync {
    fn insert(&self, submission: Submission, audit: AuditEntry)
        -> Result<Submission, StoreError>;

    fn load(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;

    fn save(
        &self,
        submission: Submission,
        expected_version: u64,
        audit: AuditEntry,
    ) -> Result<Submission, StoreError>;

    /// The submitter's non-terminal submission of the given type, if any.
    fn find_active(
        &self,
        submitter: &ActorId,
        submission_type: SubmissionType,
    ) -> Result<Option<Submission>, StoreError>;

    /// All submissions lodged by one submitter, for verification progress.
    fn find_by_submitter(&self, submitter: &ActorId) -> Result<Vec<Submission>, StoreError>;
}
