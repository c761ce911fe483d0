//! Sample entry: the root aggregate moved through the workflow

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{
    CookingReport, FinancialCalculation, InventoryData, LotAllotment, PhysicalInspection,
    QualityParameters, SampleEntryOffering,
};
use crate::types::StageStamp;
use crate::workflow::{LotSelectionDecision, WorkflowPhase};

/// How the sample reached the mill
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CollectionSource {
    /// Sample drawn at the mill gate
    #[default]
    MillSample,
    /// Sample collected at the party's location
    LocationSample,
}

/// Bag packaging of the lot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Packaging {
    #[default]
    Jute,
    Plastic,
    Loose,
}

/// Actor and time of each stage decision
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageDecisions {
    pub staff_submitted: Option<StageStamp>,
    pub quality_checked: Option<StageStamp>,
    pub lot_selected: Option<StageStamp>,
    pub cooking_reported: Option<StageStamp>,
    pub final_reported: Option<StageStamp>,
    pub lots_allotted: Option<StageStamp>,
    pub inspection_completed: Option<StageStamp>,
    pub inventory_recorded: Option<StageStamp>,
    pub owner_approved: Option<StageStamp>,
    pub manager_approved: Option<StageStamp>,
    pub final_reviewed: Option<StageStamp>,
    pub rejected: Option<StageStamp>,
}

impl StageDecisions {
    /// Record who closed out `phase`
    pub fn stamp(&mut self, phase: WorkflowPhase, stamp: StageStamp) {
        let slot = match phase {
            WorkflowPhase::StaffEntry => &mut self.staff_submitted,
            WorkflowPhase::QualityCheck => &mut self.quality_checked,
            WorkflowPhase::LotSelection => &mut self.lot_selected,
            WorkflowPhase::CookingReport => &mut self.cooking_reported,
            WorkflowPhase::FinalReport => &mut self.final_reported,
            WorkflowPhase::LotAllotment => &mut self.lots_allotted,
            WorkflowPhase::PhysicalInspection => &mut self.inspection_completed,
            WorkflowPhase::InventoryEntry => &mut self.inventory_recorded,
            WorkflowPhase::OwnerFinancial => &mut self.owner_approved,
            WorkflowPhase::ManagerFinancial => &mut self.manager_approved,
            WorkflowPhase::FinalReview => &mut self.final_reviewed,
            WorkflowPhase::Completed | WorkflowPhase::Failed => &mut self.rejected,
        };
        *slot = Some(stamp);
    }
}

/// A grain lot submitted for staged quality and price evaluation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleEntry {
    pub id: Uuid,
    pub broker_name: String,
    pub party_name: String,
    pub variety: String,
    pub bags: i32,
    pub packaging: Packaging,
    pub collection_source: CollectionSource,
    pub location: Option<String>,
    pub workflow_status: WorkflowPhase,
    pub lot_selection_decision: Option<LotSelectionDecision>,
    pub decisions: StageDecisions,
    pub rejection_reason: Option<String>,
    /// Live offering price as of the final report
    pub offering_price: Option<Decimal>,
    /// Frozen price once the offering is finalized
    pub final_price: Option<Decimal>,
    /// Bumped on every write; the compare-and-swap token
    pub version: i64,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_by: Uuid,
    pub updated_at: DateTime<Utc>,
}

impl SampleEntry {
    pub fn new(input: CreateSampleEntryInput, stamp: StageStamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            broker_name: input.broker_name.trim().to_string(),
            party_name: input.party_name.trim().to_string(),
            variety: input.variety.trim().to_string(),
            bags: input.bags,
            packaging: input.packaging,
            collection_source: input.collection_source,
            location: input.location,
            workflow_status: WorkflowPhase::StaffEntry,
            lot_selection_decision: None,
            decisions: StageDecisions::default(),
            rejection_reason: None,
            offering_price: None,
            final_price: None,
            version: 0,
            created_by: stamp.by,
            created_at: stamp.at,
            updated_by: stamp.by,
            updated_at: stamp.at,
        }
    }

    /// Names of the metadata fields still missing for staff submission
    pub fn missing_metadata(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.broker_name.trim().is_empty() {
            missing.push("broker_name".to_string());
        }
        if self.variety.trim().is_empty() {
            missing.push("variety".to_string());
        }
        if self.bags <= 0 {
            missing.push("bags".to_string());
        }
        if self.collection_source == CollectionSource::LocationSample
            && self.location.as_deref().map_or(true, |l| l.trim().is_empty())
        {
            missing.push("location".to_string());
        }
        missing
    }

    /// Advance the audit fields for a write by `stamp`
    pub fn touch(&mut self, stamp: StageStamp) {
        self.version += 1;
        self.updated_by = stamp.by;
        self.updated_at = stamp.at;
    }
}

/// Input for registering a new sample entry
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateSampleEntryInput {
    #[validate(length(min = 1, message = "Broker name is required"))]
    pub broker_name: String,
    #[validate(length(min = 1, message = "Party name is required"))]
    pub party_name: String,
    #[validate(length(min = 1, message = "Variety is required"))]
    pub variety: String,
    #[validate(range(min = 1, message = "Bags must be positive"))]
    pub bags: i32,
    #[serde(default)]
    pub packaging: Packaging,
    #[serde(default)]
    pub collection_source: CollectionSource,
    #[serde(default)]
    pub location: Option<String>,
}

/// A sample entry with every child record it owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryAggregate {
    pub entry: SampleEntry,
    pub quality: Option<QualityParameters>,
    pub cooking: Option<CookingReport>,
    pub offering: Option<SampleEntryOffering>,
    pub allotments: Vec<LotAllotment>,
    pub inspections: Vec<PhysicalInspection>,
    pub inventory: Vec<InventoryData>,
    pub financials: Vec<FinancialCalculation>,
}

impl EntryAggregate {
    pub fn new(entry: SampleEntry) -> Self {
        Self {
            entry,
            quality: None,
            cooking: None,
            offering: None,
            allotments: Vec::new(),
            inspections: Vec::new(),
            inventory: Vec::new(),
            financials: Vec::new(),
        }
    }

    pub fn allotment(&self, lot_id: Uuid) -> Option<&LotAllotment> {
        self.allotments.iter().find(|a| a.id == lot_id)
    }

    pub fn active_allotments(&self) -> impl Iterator<Item = &LotAllotment> {
        self.allotments.iter().filter(|a| !a.is_closed)
    }

    pub fn inventory_for(&self, inspection_id: Uuid) -> Option<&InventoryData> {
        self.inventory.iter().find(|i| i.inspection_id == inspection_id)
    }

    pub fn financial_for(&self, inventory_id: Uuid) -> Option<&FinancialCalculation> {
        self.financials.iter().find(|f| f.inventory_id == inventory_id)
    }
}
