//! Two-tier verification review: a moderator recommends, an admin renders
//! the binding decision (approve, send back for another pass, or override).

pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    AdminDecision, AdminRuling, ModeratorReview, Recommendation, Submission, SubmissionId,
    SubmissionStatus, SubmissionType, SubmissionView,
};
pub use router::{submission_router, SubmissionRouterState};
pub use service::{SubmissionWorkflow, VerificationProgress};
pub use store::SubmissionStore;
