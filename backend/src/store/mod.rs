//! Storage collaborator of the workflow engine
//!
//! The engine reads whole aggregates and writes an entry together with its
//! derived child records in one atomic unit. The entry write is a
//! compare-and-swap on `(workflow_status, version)`: if another writer got
//! there first the save fails with `Conflict` and nothing is written.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::{
    CookingReport, EntryAggregate, FinancialCalculation, InventoryData, LotAllotment,
    PhysicalInspection, PurchaseRate, QualityParameters, SampleEntry, SampleEntryOffering,
    WorkflowPhase,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// What the caller believes is stored before its write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedState {
    pub status: WorkflowPhase,
    pub version: i64,
}

impl ExpectedState {
    pub fn of(entry: &SampleEntry) -> Self {
        Self {
            status: entry.workflow_status,
            version: entry.version,
        }
    }
}

/// Kind tag of a child record row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Quality,
    Cooking,
    Offering,
    Allotment,
    Inspection,
    Inventory,
    Financial,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Quality => "quality",
            RecordKind::Cooking => "cooking",
            RecordKind::Offering => "offering",
            RecordKind::Allotment => "allotment",
            RecordKind::Inspection => "inspection",
            RecordKind::Inventory => "inventory",
            RecordKind::Financial => "financial",
        }
    }
}

/// A child record written alongside its entry. Writes are upserts by id.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildWrite {
    Quality(QualityParameters),
    Cooking(CookingReport),
    Offering(SampleEntryOffering),
    Allotment(LotAllotment),
    Inspection(PhysicalInspection),
    Inventory(InventoryData),
    Financial(FinancialCalculation),
}

impl ChildWrite {
    pub fn kind(&self) -> RecordKind {
        match self {
            ChildWrite::Quality(_) => RecordKind::Quality,
            ChildWrite::Cooking(_) => RecordKind::Cooking,
            ChildWrite::Offering(_) => RecordKind::Offering,
            ChildWrite::Allotment(_) => RecordKind::Allotment,
            ChildWrite::Inspection(_) => RecordKind::Inspection,
            ChildWrite::Inventory(_) => RecordKind::Inventory,
            ChildWrite::Financial(_) => RecordKind::Financial,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ChildWrite::Quality(r) => r.id,
            ChildWrite::Cooking(r) => r.id,
            ChildWrite::Offering(r) => r.id,
            ChildWrite::Allotment(r) => r.id,
            ChildWrite::Inspection(r) => r.id,
            ChildWrite::Inventory(r) => r.id,
            ChildWrite::Financial(r) => r.id,
        }
    }

    /// Lot the record belongs to, for the lot lookup index
    pub fn lot_id(&self) -> Option<Uuid> {
        match self {
            ChildWrite::Allotment(r) => Some(r.id),
            ChildWrite::Inspection(r) => Some(r.lot_id),
            _ => None,
        }
    }

    /// Fold this write into an in-memory aggregate
    pub fn apply_to(self, aggregate: &mut EntryAggregate) {
        fn upsert<T>(records: &mut Vec<T>, record: T, same: impl Fn(&T) -> bool) {
            match records.iter_mut().find(|r| same(r)) {
                Some(slot) => *slot = record,
                None => records.push(record),
            }
        }

        match self {
            ChildWrite::Quality(r) => aggregate.quality = Some(r),
            ChildWrite::Cooking(r) => aggregate.cooking = Some(r),
            ChildWrite::Offering(r) => aggregate.offering = Some(r),
            ChildWrite::Allotment(r) => {
                let id = r.id;
                upsert(&mut aggregate.allotments, r, |a| a.id == id)
            }
            ChildWrite::Inspection(r) => {
                let id = r.id;
                upsert(&mut aggregate.inspections, r, |i| i.id == id)
            }
            ChildWrite::Inventory(r) => {
                let id = r.id;
                upsert(&mut aggregate.inventory, r, |i| i.id == id)
            }
            ChildWrite::Financial(r) => {
                let id = r.id;
                upsert(&mut aggregate.financials, r, |f| f.id == id)
            }
        }
    }
}

/// Persistence interface consumed by the engine
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Store a newly created entry
    async fn insert_entry(&self, entry: &SampleEntry) -> AppResult<()>;

    /// Load an entry with every child record
    async fn load(&self, entry_id: Uuid) -> AppResult<Option<EntryAggregate>>;

    /// Entry owning a lot
    async fn find_lot(&self, lot_id: Uuid) -> AppResult<Option<Uuid>>;

    /// Atomically replace the entry and upsert `writes`, provided the stored
    /// entry still matches `expected`
    async fn save_transaction(
        &self,
        expected: ExpectedState,
        entry: &SampleEntry,
        writes: &[ChildWrite],
    ) -> AppResult<()>;

    async fn load_purchase_rate(&self, rate_id: Uuid) -> AppResult<Option<PurchaseRate>>;

    async fn find_purchase_rate_by_arrival(&self, arrival_id: Uuid) -> AppResult<Option<PurchaseRate>>;

    /// Insert when `expected_version` is `None`, otherwise compare-and-swap
    /// on the stored version
    async fn save_purchase_rate(&self, rate: &PurchaseRate, expected_version: Option<i64>) -> AppResult<()>;
}
