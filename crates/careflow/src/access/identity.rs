use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Identifier wrapper for authenticated actors and linked parties.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// The authenticated caller, resolved once per request and immutable after.
///
/// `links` is the precomputed linkage set used for own-resource checks: a
/// guardian carries its patient ids, an agency the ids of its caregivers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: ActorId,
    pub role: Role,
    #[serde(default)]
    pub links: BTreeSet<ActorId>,
}

impl Identity {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: ActorId::new(id),
            role,
            links: BTreeSet::new(),
        }
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(ActorId::new).collect();
        self
    }

    /// True iff the caller is the owner or is linked to the owner.
    pub fn owns(&self, owner: &ActorId) -> bool {
        self.id == *owner || self.links.contains(owner)
    }
}

/// Raised when a credential cannot be resolved to an identity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential could not be resolved to an identity")]
pub struct AuthenticationError;

/// Boundary to the identity provider. The gate treats this as a black box
/// supplied per request.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credential: &str) -> Result<Identity, AuthenticationError>;
}
