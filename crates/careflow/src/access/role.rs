use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marketplace roles, fixed at system initialization.
///
/// The tiers form a total order for hierarchy comparisons: SuperAdmin over
/// Admin over Moderator over the peer tier (Agency, Caregiver, Guardian,
/// Shop), which shares a single rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Moderator,
    Agency,
    Caregiver,
    Guardian,
    Shop,
}

/// Raised when a role string does not name a member of the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    pub const fn ordered() -> [Self; 7] {
        [
            Self::SuperAdmin,
            Self::Admin,
            Self::Moderator,
            Self::Agency,
            Self::Caregiver,
            Self::Guardian,
            Self::Shop,
        ]
    }

    /// Hierarchy rank. Higher value dominates lower.
    pub const fn rank(self) -> u8 {
        match self {
            Self::SuperAdmin => 40,
            Self::Admin => 30,
            Self::Moderator => 20,
            Self::Agency | Self::Caregiver | Self::Guardian | Self::Shop => 10,
        }
    }

    /// True iff `self` sits at or above `other` in the hierarchy.
    pub const fn dominates(self, other: Role) -> bool {
        self.rank() >= other.rank()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Agency => "agency",
            Self::Caregiver => "caregiver",
            Self::Guardian => "guardian",
            Self::Shop => "shop",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "super_admin" | "superadmin" => Ok(Self::SuperAdmin),
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "agency" => Ok(Self::Agency),
            "caregiver" => Ok(Self::Caregiver),
            "guardian" => Ok(Self::Guardian),
            "shop" => Ok(Self::Shop),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
