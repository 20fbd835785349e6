//! Role registry, permission matrix, and the authorization gate consulted by
//! every protected operation.

pub mod gate;
pub mod identity;
pub mod matrix;
pub mod role;

pub use gate::{AuthorizationGate, Decision, DenyReason};
pub use identity::{ActorId, AuthenticationError, Identity, IdentityResolver};
pub use matrix::{Action, PermissionMatrix, PermissionOutcome, Resource};
pub use role::{Role, UnknownRole};
