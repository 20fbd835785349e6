use serde::Serialize;

use crate::access::Resource;

/// Outbound signal emitted on terminal transitions, send-backs, and
/// escalations so downstream channels (SMS, e-mail, dashboards) can react.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSignal {
    pub topic: &'static str,
    pub entity_kind: Resource,
    pub entity_id: String,
    pub status: &'static str,
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook. Dispatch is
/// fire-and-forget: a delivery failure never rolls back the transition that
/// produced the signal.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, signal: WorkflowSignal) -> Result<(), NotifyError>;
}
