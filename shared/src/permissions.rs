//! Role permission matrix
//!
//! One row per role with five resource sets and one phase set. The matrix is
//! an immutable value: build it once at start (built-in mill defaults or a
//! JSON document) and hand it to whatever needs to authorize. Workflow phase
//! access is derived from each row's `can_transition` set, so there is no
//! second table to keep in sync.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::models::{Action, Resource, UserRole};
use crate::workflow::WorkflowPhase;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AllSentinel {
    #[serde(rename = "all")]
    All,
}

/// Membership set with the `"all"` sentinel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Grant<T: Ord> {
    All(AllSentinel),
    Only(BTreeSet<T>),
}

impl<T: Ord> Grant<T> {
    pub fn all() -> Self {
        Grant::All(AllSentinel::All)
    }

    pub fn none() -> Self {
        Grant::Only(BTreeSet::new())
    }

    pub fn of(items: impl IntoIterator<Item = T>) -> Self {
        Grant::Only(items.into_iter().collect())
    }

    pub fn contains(&self, item: &T) -> bool {
        match self {
            Grant::All(_) => true,
            Grant::Only(items) => items.contains(item),
        }
    }
}

impl<T: Ord> Default for Grant<T> {
    fn default() -> Self {
        Grant::none()
    }
}

/// Permission row of a single role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RolePermissions {
    #[serde(default)]
    pub can_create: Grant<Resource>,
    #[serde(default)]
    pub can_read: Grant<Resource>,
    #[serde(default)]
    pub can_update: Grant<Resource>,
    #[serde(default)]
    pub can_delete: Grant<Resource>,
    #[serde(default)]
    pub can_approve: Grant<Resource>,
    #[serde(default)]
    pub can_transition: Grant<WorkflowPhase>,
}

impl RolePermissions {
    pub fn admin() -> Self {
        Self {
            can_create: Grant::all(),
            can_read: Grant::all(),
            can_update: Grant::all(),
            can_delete: Grant::all(),
            can_approve: Grant::all(),
            can_transition: Grant::all(),
        }
    }

    fn resources(&self, action: Action) -> &Grant<Resource> {
        match action {
            Action::Create => &self.can_create,
            Action::Read => &self.can_read,
            Action::Update => &self.can_update,
            Action::Delete => &self.can_delete,
            Action::Approve => &self.can_approve,
        }
    }
}

/// Immutable role -> permissions table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PermissionMatrix {
    roles: HashMap<UserRole, RolePermissions>,
}

impl PermissionMatrix {
    pub fn new(roles: HashMap<UserRole, RolePermissions>) -> Self {
        Self { roles }
    }

    /// Parse a matrix document; every known role must have a row
    pub fn from_json(json: &str) -> DomainResult<Self> {
        let matrix: PermissionMatrix =
            serde_json::from_str(json).map_err(|e| DomainError::InvalidMatrix(e.to_string()))?;
        for role in UserRole::ALL {
            if !matrix.roles.contains_key(&role) {
                return Err(DomainError::InvalidMatrix(format!(
                    "missing row for role {}",
                    role
                )));
            }
        }
        Ok(matrix)
    }

    /// The mill's standard role table
    pub fn mill_default() -> Self {
        use Resource as R;
        use WorkflowPhase as P;

        let mut roles = HashMap::new();
        roles.insert(UserRole::Admin, RolePermissions::admin());
        roles.insert(
            UserRole::Owner,
            RolePermissions {
                can_create: Grant::of([R::SampleEntryOffering, R::FinancialCalculation, R::User]),
                can_read: Grant::all(),
                can_update: Grant::of([
                    R::SampleEntryOffering,
                    R::FinancialCalculation,
                    R::PurchaseRate,
                ]),
                can_delete: Grant::none(),
                can_approve: Grant::of([
                    R::SampleEntry,
                    R::SampleEntryOffering,
                    R::FinancialCalculation,
                    R::PurchaseRate,
                ]),
                can_transition: Grant::of([P::OwnerFinancial, P::FinalReview]),
            },
        );
        roles.insert(
            UserRole::Manager,
            RolePermissions {
                can_create: Grant::of([
                    R::SampleEntry,
                    R::LotAllotment,
                    R::SampleEntryOffering,
                    R::PurchaseRate,
                    R::User,
                ]),
                can_read: Grant::all(),
                can_update: Grant::of([
                    R::SampleEntry,
                    R::LotAllotment,
                    R::SampleEntryOffering,
                    R::PurchaseRate,
                ]),
                can_delete: Grant::of([R::LotAllotment]),
                can_approve: Grant::of([R::SampleEntry, R::SampleEntryOffering]),
                can_transition: Grant::of([
                    P::LotSelection,
                    P::FinalReport,
                    P::LotAllotment,
                    P::ManagerFinancial,
                ]),
            },
        );
        roles.insert(
            UserRole::Staff,
            RolePermissions {
                can_create: Grant::of([R::SampleEntry, R::PurchaseRate]),
                can_read: Grant::of([R::SampleEntry, R::PurchaseRate]),
                can_update: Grant::of([R::SampleEntry]),
                can_delete: Grant::none(),
                can_approve: Grant::none(),
                can_transition: Grant::of([P::StaffEntry]),
            },
        );
        roles.insert(
            UserRole::QualitySupervisor,
            RolePermissions {
                can_create: Grant::of([R::QualityParameters, R::CookingReport]),
                can_read: Grant::of([R::SampleEntry, R::QualityParameters, R::CookingReport]),
                can_update: Grant::of([R::QualityParameters, R::CookingReport]),
                can_delete: Grant::none(),
                can_approve: Grant::none(),
                can_transition: Grant::of([P::QualityCheck, P::CookingReport]),
            },
        );
        roles.insert(
            UserRole::PhysicalSupervisor,
            RolePermissions {
                can_create: Grant::of([R::PhysicalInspection]),
                can_read: Grant::of([R::SampleEntry, R::LotAllotment, R::PhysicalInspection]),
                can_update: Grant::of([R::LotAllotment, R::PhysicalInspection]),
                can_delete: Grant::none(),
                can_approve: Grant::none(),
                can_transition: Grant::of([P::PhysicalInspection]),
            },
        );
        roles.insert(
            UserRole::InventoryStaff,
            RolePermissions {
                can_create: Grant::of([R::InventoryData]),
                can_read: Grant::of([
                    R::SampleEntry,
                    R::LotAllotment,
                    R::PhysicalInspection,
                    R::InventoryData,
                ]),
                can_update: Grant::of([R::InventoryData]),
                can_delete: Grant::none(),
                can_approve: Grant::none(),
                can_transition: Grant::of([P::InventoryEntry]),
            },
        );
        Self { roles }
    }

    pub fn row(&self, role: UserRole) -> Option<&RolePermissions> {
        self.roles.get(&role)
    }

    /// True iff the role's set for `action` holds `resource` or the sentinel
    pub fn can_perform_action(&self, role: UserRole, action: Action, resource: Resource) -> bool {
        self.row(role)
            .map(|row| row.resources(action).contains(&resource))
            .unwrap_or(false)
    }

    /// Whether the role may advance entries sitting in `phase`.
    ///
    /// Derived from `can_transition`; terminal phases accept nobody.
    pub fn can_access_workflow_phase(&self, role: UserRole, phase: WorkflowPhase) -> bool {
        if phase.is_terminal() {
            return false;
        }
        self.row(role)
            .map(|row| row.can_transition.contains(&phase))
            .unwrap_or(false)
    }

    /// Phase -> roles view of the matrix
    pub fn roles_for_phase(&self, phase: WorkflowPhase) -> Vec<UserRole> {
        let mut roles: Vec<UserRole> = UserRole::ALL
            .into_iter()
            .filter(|role| self.can_access_workflow_phase(*role, phase))
            .collect();
        roles.sort();
        roles
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::mill_default()
    }
}

/// Whether `creator` may create users holding `target`.
///
/// Only admins create arbitrary roles; managers may create supervisor-tier
/// roles. This rule does not consult the matrix.
pub fn can_create_user_role(creator: UserRole, target: UserRole) -> bool {
    match creator {
        UserRole::Admin => true,
        UserRole::Manager => target.is_supervisor_tier(),
        _ => false,
    }
}
