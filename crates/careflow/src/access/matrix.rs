use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Resource kinds protected by the permission matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    User,
    Patient,
    Job,
    Payment,
    Product,
    Submission,
    Dispute,
    Analytics,
    AuditLog,
}

impl Resource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Patient => "patient",
            Self::Job => "job",
            Self::Payment => "payment",
            Self::Product => "product",
            Self::Submission => "submission",
            Self::Dispute => "dispute",
            Self::Analytics => "analytics",
            Self::AuditLog => "audit_log",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
    Delete,
    Manage,
}

impl Action {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }
}

/// Outcome of a matrix lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionOutcome {
    /// Access to any resource of the kind.
    Allow,
    /// Access limited to resources the caller owns or is linked to.
    AllowOwn,
    Deny,
}

/// Static (role, resource, action) lookup table, built once at startup.
///
/// Lookups missing an explicit entry resolve to `Deny`. There is no
/// wildcard matching and no rule inheritance; every combination the system
/// exercises has its own row so the permission surface can be audited by
/// reading the table.
#[derive(Debug, Clone)]
pub struct PermissionMatrix {
    rules: BTreeMap<(Role, Resource, Action), PermissionOutcome>,
}

impl PermissionMatrix {
    pub fn new<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (Role, Resource, Action, PermissionOutcome)>,
    {
        let rules = rules
            .into_iter()
            .map(|(role, resource, action, outcome)| ((role, resource, action), outcome))
            .collect();
        Self { rules }
    }

    /// The marketplace's production permission table.
    pub fn marketplace_defaults() -> Self {
        use Action::{Delete, Manage, Read, Write};
        use PermissionOutcome::{Allow, AllowOwn};
        use Resource::{
            Analytics, AuditLog, Dispute, Job, Patient, Payment, Product, Submission, User,
        };
        use Role::{Admin, Agency, Caregiver, Guardian, Moderator, Shop, SuperAdmin};

        Self::new([
            // Platform operators.
            (SuperAdmin, User, Read, Allow),
            (SuperAdmin, User, Write, Allow),
            (SuperAdmin, User, Delete, Allow),
            (SuperAdmin, User, Manage, Allow),
            (SuperAdmin, Patient, Read, Allow),
            (SuperAdmin, Patient, Write, Allow),
            (SuperAdmin, Job, Read, Allow),
            (SuperAdmin, Job, Write, Allow),
            (SuperAdmin, Payment, Read, Allow),
            (SuperAdmin, Payment, Write, Allow),
            (SuperAdmin, Payment, Manage, Allow),
            (SuperAdmin, Product, Read, Allow),
            (SuperAdmin, Submission, Read, Allow),
            (SuperAdmin, Submission, Write, Allow),
            (SuperAdmin, Dispute, Read, Allow),
            (SuperAdmin, Dispute, Write, Allow),
            (SuperAdmin, Analytics, Read, Allow),
            (SuperAdmin, AuditLog, Read, Allow),
            (Admin, User, Read, Allow),
            (Admin, User, Write, Allow),
            (Admin, Patient, Read, Allow),
            (Admin, Job, Read, Allow),
            (Admin, Payment, Read, Allow),
            (Admin, Payment, Manage, Allow),
            (Admin, Product, Read, Allow),
            (Admin, Submission, Read, Allow),
            (Admin, Submission, Write, Allow),
            (Admin, Dispute, Read, Allow),
            (Admin, Dispute, Write, Allow),
            (Admin, Analytics, Read, Allow),
            (Admin, AuditLog, Read, Allow),
            // First-tier review.
            (Moderator, User, Read, Allow),
            (Moderator, Patient, Read, Allow),
            (Moderator, Job, Read, Allow),
            (Moderator, Payment, Read, Allow),
            (Moderator, Product, Read, Allow),
            (Moderator, Submission, Read, Allow),
            (Moderator, Submission, Write, Allow),
            (Moderator, Dispute, Read, Allow),
            (Moderator, Dispute, Write, Allow),
            (Moderator, Analytics, Read, Allow),
            // Marketplace participants: own-resource grants only.
            (Agency, Submission, Read, AllowOwn),
            (Agency, Submission, Write, AllowOwn),
            (Agency, Job, Read, AllowOwn),
            (Agency, Job, Write, AllowOwn),
            (Agency, Dispute, Read, AllowOwn),
            (Agency, Payment, Read, AllowOwn),
            (Agency, Analytics, Read, AllowOwn),
            (Caregiver, Submission, Read, AllowOwn),
            (Caregiver, Submission, Write, AllowOwn),
            (Caregiver, Job, Read, AllowOwn),
            (Caregiver, Patient, Read, AllowOwn),
            (Caregiver, Dispute, Read, AllowOwn),
            (Caregiver, Dispute, Write, AllowOwn),
            (Caregiver, Payment, Read, AllowOwn),
            (Guardian, Patient, Read, AllowOwn),
            (Guardian, Patient, Write, AllowOwn),
            (Guardian, Job, Read, AllowOwn),
            (Guardian, Job, Write, AllowOwn),
            (Guardian, Dispute, Read, AllowOwn),
            (Guardian, Dispute, Write, AllowOwn),
            (Guardian, Payment, Read, AllowOwn),
            (Guardian, Payment, Write, AllowOwn),
            (Shop, Product, Read, AllowOwn),
            (Shop, Product, Write, AllowOwn),
            (Shop, Dispute, Read, AllowOwn),
            (Shop, Payment, Read, AllowOwn),
        ])
    }

    /// Resolve a triple. Absent entries deny (fail-closed).
    pub fn lookup(&self, role: Role, resource: Resource, action: Action) -> PermissionOutcome {
        self.rules
            .get(&(role, resource, action))
            .copied()
            .unwrap_or(PermissionOutcome::Deny)
    }

    /// Iterate every explicit rule, for audit-by-inspection tooling.
    pub fn entries(
        &self,
    ) -> impl Iterator<Item = (Role, Resource, Action, PermissionOutcome)> + '_ {
        self.rules
            .iter()
            .map(|(&(role, resource, action), &outcome)| (role, resource, action, outcome))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
