//! User roles, resource kinds and actions

use serde::{Deserialize, Serialize};

/// Roles known to the mill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Owner,
    Manager,
    Staff,
    QualitySupervisor,
    PhysicalSupervisor,
    InventoryStaff,
}

impl UserRole {
    pub const ALL: [UserRole; 7] = [
        UserRole::Admin,
        UserRole::Owner,
        UserRole::Manager,
        UserRole::Staff,
        UserRole::QualitySupervisor,
        UserRole::PhysicalSupervisor,
        UserRole::InventoryStaff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Owner => "owner",
            UserRole::Manager => "manager",
            UserRole::Staff => "staff",
            UserRole::QualitySupervisor => "quality_supervisor",
            UserRole::PhysicalSupervisor => "physical_supervisor",
            UserRole::InventoryStaff => "inventory_staff",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        UserRole::ALL.into_iter().find(|r| r.as_str() == s)
    }

    /// Supervisor-tier roles a manager may create
    pub fn is_supervisor_tier(&self) -> bool {
        matches!(
            self,
            UserRole::QualitySupervisor | UserRole::PhysicalSupervisor
        )
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource kinds guarded by the permission matrix
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    SampleEntry,
    QualityParameters,
    CookingReport,
    LotAllotment,
    PhysicalInspection,
    InventoryData,
    FinancialCalculation,
    SampleEntryOffering,
    PurchaseRate,
    User,
}

impl Resource {
    pub const ALL: [Resource; 10] = [
        Resource::SampleEntry,
        Resource::QualityParameters,
        Resource::CookingReport,
        Resource::LotAllotment,
        Resource::PhysicalInspection,
        Resource::InventoryData,
        Resource::FinancialCalculation,
        Resource::SampleEntryOffering,
        Resource::PurchaseRate,
        Resource::User,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::SampleEntry => "sample_entry",
            Resource::QualityParameters => "quality_parameters",
            Resource::CookingReport => "cooking_report",
            Resource::LotAllotment => "lot_allotment",
            Resource::PhysicalInspection => "physical_inspection",
            Resource::InventoryData => "inventory_data",
            Resource::FinancialCalculation => "financial_calculation",
            Resource::SampleEntryOffering => "sample_entry_offering",
            Resource::PurchaseRate => "purchase_rate",
            Resource::User => "user",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Resource::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Approve,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Approve => "approve",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Action::Create),
            "read" => Some(Action::Read),
            "update" => Some(Action::Update),
            "delete" => Some(Action::Delete),
            "approve" => Some(Action::Approve),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
