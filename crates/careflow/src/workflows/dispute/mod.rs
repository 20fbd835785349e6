//! User-raised dispute lifecycle: moderator review, mandatory escalation
//! for high-severity types, admin resolution, and the escrow release gate.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Dispute, DisputeId, DisputeSeverity, DisputeStatus, DisputeType, DisputeView, JobId,
    Resolution,
};
pub use router::{dispute_router, DisputeRouterState};
pub use service::{DisputeWorkflow, EscrowState, RaiseDisputeRequest};
pub use store::DisputeStore;
