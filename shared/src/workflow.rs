//! Workflow phases of a sample entry and the edges between them

use serde::{Deserialize, Serialize};

/// Phase of a sample entry in the approval pipeline
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowPhase {
    StaffEntry,
    QualityCheck,
    LotSelection,
    CookingReport,
    FinalReport,
    LotAllotment,
    PhysicalInspection,
    InventoryEntry,
    OwnerFinancial,
    ManagerFinancial,
    FinalReview,
    Completed,
    Failed,
}

impl WorkflowPhase {
    pub const ALL: [WorkflowPhase; 13] = [
        WorkflowPhase::StaffEntry,
        WorkflowPhase::QualityCheck,
        WorkflowPhase::LotSelection,
        WorkflowPhase::CookingReport,
        WorkflowPhase::FinalReport,
        WorkflowPhase::LotAllotment,
        WorkflowPhase::PhysicalInspection,
        WorkflowPhase::InventoryEntry,
        WorkflowPhase::OwnerFinancial,
        WorkflowPhase::ManagerFinancial,
        WorkflowPhase::FinalReview,
        WorkflowPhase::Completed,
        WorkflowPhase::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPhase::StaffEntry => "STAFF_ENTRY",
            WorkflowPhase::QualityCheck => "QUALITY_CHECK",
            WorkflowPhase::LotSelection => "LOT_SELECTION",
            WorkflowPhase::CookingReport => "COOKING_REPORT",
            WorkflowPhase::FinalReport => "FINAL_REPORT",
            WorkflowPhase::LotAllotment => "LOT_ALLOTMENT",
            WorkflowPhase::PhysicalInspection => "PHYSICAL_INSPECTION",
            WorkflowPhase::InventoryEntry => "INVENTORY_ENTRY",
            WorkflowPhase::OwnerFinancial => "OWNER_FINANCIAL",
            WorkflowPhase::ManagerFinancial => "MANAGER_FINANCIAL",
            WorkflowPhase::FinalReview => "FINAL_REVIEW",
            WorkflowPhase::Completed => "COMPLETED",
            WorkflowPhase::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        WorkflowPhase::ALL.into_iter().find(|p| p.as_str() == s)
    }

    /// Completed and failed entries absorb every further request
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowPhase::Completed | WorkflowPhase::Failed)
    }

    /// The single successor of a phase outside `LOT_SELECTION`.
    ///
    /// `LOT_SELECTION` branches on the recorded decision, see
    /// [`LotSelectionDecision::next_phase`]; terminal phases have none.
    pub fn linear_successor(&self) -> Option<WorkflowPhase> {
        match self {
            WorkflowPhase::StaffEntry => Some(WorkflowPhase::QualityCheck),
            WorkflowPhase::QualityCheck => Some(WorkflowPhase::LotSelection),
            WorkflowPhase::LotSelection => None,
            WorkflowPhase::CookingReport => Some(WorkflowPhase::FinalReport),
            WorkflowPhase::FinalReport => Some(WorkflowPhase::LotAllotment),
            WorkflowPhase::LotAllotment => Some(WorkflowPhase::PhysicalInspection),
            WorkflowPhase::PhysicalInspection => Some(WorkflowPhase::InventoryEntry),
            WorkflowPhase::InventoryEntry => Some(WorkflowPhase::OwnerFinancial),
            WorkflowPhase::OwnerFinancial => Some(WorkflowPhase::ManagerFinancial),
            WorkflowPhase::ManagerFinancial => Some(WorkflowPhase::FinalReview),
            WorkflowPhase::FinalReview => Some(WorkflowPhase::Completed),
            WorkflowPhase::Completed | WorkflowPhase::Failed => None,
        }
    }

    /// Every phase reachable in one forward step, regardless of payload
    pub fn forward_targets(&self) -> Vec<WorkflowPhase> {
        match self {
            WorkflowPhase::LotSelection => LotSelectionDecision::ALL
                .iter()
                .map(|d| d.next_phase())
                .collect(),
            other => other.linear_successor().into_iter().collect(),
        }
    }
}

impl std::fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the lot-selection stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LotSelectionDecision {
    PassWithoutCooking,
    PassWithCooking,
    Fail,
}

impl LotSelectionDecision {
    pub const ALL: [LotSelectionDecision; 3] = [
        LotSelectionDecision::PassWithoutCooking,
        LotSelectionDecision::PassWithCooking,
        LotSelectionDecision::Fail,
    ];

    /// `FAIL` goes straight to `FAILED` and `PASS_WITHOUT_COOKING` skips the
    /// cooking report; these are the only two forward skips in the graph.
    pub fn next_phase(&self) -> WorkflowPhase {
        match self {
            LotSelectionDecision::PassWithCooking => WorkflowPhase::CookingReport,
            LotSelectionDecision::PassWithoutCooking => WorkflowPhase::FinalReport,
            LotSelectionDecision::Fail => WorkflowPhase::Failed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LotSelectionDecision::PassWithoutCooking => "PASS_WITHOUT_COOKING",
            LotSelectionDecision::PassWithCooking => "PASS_WITH_COOKING",
            LotSelectionDecision::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for LotSelectionDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolve the successor of `current`, taking the lot-selection decision
/// into account. `None` means `current` has no forward edge for the input.
pub fn successor(
    current: WorkflowPhase,
    decision: Option<LotSelectionDecision>,
) -> Option<WorkflowPhase> {
    match current {
        WorkflowPhase::LotSelection => decision.map(|d| d.next_phase()),
        other => other.linear_successor(),
    }
}

/// Whether `from -> to` is an edge of the phase graph.
///
/// Explicit rejection (any non-terminal phase to `FAILED`) is a separate
/// operation and is reported by [`is_rejection_edge`].
pub fn is_forward_edge(from: WorkflowPhase, to: WorkflowPhase) -> bool {
    from.forward_targets().contains(&to)
}

pub fn is_rejection_edge(from: WorkflowPhase, to: WorkflowPhase) -> bool {
    !from.is_terminal() && to == WorkflowPhase::Failed
}
