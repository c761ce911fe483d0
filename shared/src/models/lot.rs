//! Lot allotment and physical inspection models
//!
//! Inspections are append-only per lot. Whether a lot is fully inspected is
//! always derived by folding over its inspections, never kept as a counter.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::types::StageStamp;

/// A portion of a sample entry's bags assigned to a physical supervisor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotAllotment {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub supervisor_id: Uuid,
    /// `None` allots every bag of the entry
    pub allotted_bags: Option<i32>,
    /// Filled once the lot is fully inspected or closed
    pub inspected_bags: Option<i32>,
    pub allotted: StageStamp,
    pub is_closed: bool,
    pub close_reason: Option<String>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl LotAllotment {
    pub fn new(entry_id: Uuid, supervisor_id: Uuid, allotted_bags: Option<i32>, stamp: StageStamp) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_id,
            supervisor_id,
            allotted_bags,
            inspected_bags: None,
            allotted: stamp,
            is_closed: false,
            close_reason: None,
            closed_by: None,
            closed_at: None,
        }
    }

    /// Bags this lot covers, resolving "all" against the entry
    pub fn effective_bags(&self, entry_bags: i32) -> i32 {
        self.allotted_bags.unwrap_or(entry_bags)
    }

    /// Close the lot early; the reason must be non-empty
    pub fn close(&mut self, reason: &str, inspected_bags: i32, stamp: StageStamp) -> DomainResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::InvariantViolation(
                "A lot can only be closed with a reason".to_string(),
            ));
        }
        if self.is_closed {
            return Err(DomainError::InvariantViolation(format!(
                "Lot {} is already closed",
                self.id
            )));
        }
        self.is_closed = true;
        self.close_reason = Some(reason.to_string());
        self.closed_by = Some(stamp.by);
        self.closed_at = Some(stamp.at);
        self.inspected_bags = Some(inspected_bags);
        Ok(())
    }
}

/// One inspection pass over part of a lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhysicalInspection {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub entry_id: Uuid,
    /// Position of this pass within the lot, starting at 1
    pub sequence: i32,
    pub inspected_bags: i32,
    pub cutting1: Option<Decimal>,
    pub cutting2: Option<Decimal>,
    pub moisture: Option<Decimal>,
    pub remarks: Option<String>,
    /// Set on the pass that brings the lot to its allotted bags
    pub is_complete: bool,
    pub inspected: StageStamp,
}

/// Input for recording an inspection pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordInspectionInput {
    pub inspected_bags: i32,
    #[serde(default)]
    pub cutting1: Option<Decimal>,
    #[serde(default)]
    pub cutting2: Option<Decimal>,
    #[serde(default)]
    pub moisture: Option<Decimal>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Inspection state of a lot, folded from its inspections
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotProgress {
    pub lot_id: Uuid,
    pub allotted_bags: i32,
    pub inspected_bags: i32,
    pub passes: i32,
    pub is_closed: bool,
    pub is_complete: bool,
}

impl LotProgress {
    pub fn fold<'a>(
        lot: &LotAllotment,
        entry_bags: i32,
        inspections: impl IntoIterator<Item = &'a PhysicalInspection>,
    ) -> Self {
        let allotted_bags = lot.effective_bags(entry_bags);
        let (inspected_bags, passes) = inspections
            .into_iter()
            .filter(|i| i.lot_id == lot.id)
            .fold((0i32, 0i32), |(bags, passes), i| {
                (bags.saturating_add(i.inspected_bags), passes + 1)
            });
        Self {
            lot_id: lot.id,
            allotted_bags,
            inspected_bags,
            passes,
            is_closed: lot.is_closed,
            is_complete: lot.is_closed || inspected_bags >= allotted_bags,
        }
    }

    pub fn remaining(&self) -> i32 {
        (self.allotted_bags - self.inspected_bags).max(0)
    }

    /// Check that a further pass of `bags` fits in the lot, returning the
    /// lot's inspected total after it
    pub fn check_pass(&self, bags: i32) -> DomainResult<i32> {
        if self.is_closed {
            return Err(DomainError::InvariantViolation(format!(
                "Lot {} is closed and accepts no further inspections",
                self.lot_id
            )));
        }
        if bags <= 0 {
            return Err(DomainError::validation(
                "inspected_bags",
                "Inspected bags must be positive",
            ));
        }
        if bags > self.remaining() {
            return Err(DomainError::InvariantViolation(format!(
                "Inspecting {} bags would exceed the {} bags remaining on lot {}",
                bags,
                self.remaining(),
                self.lot_id
            )));
        }
        Ok(self.inspected_bags + bags)
    }
}

/// Bags of the entry not yet covered by a non-closed allotment
pub fn remaining_bags<'a>(
    entry_bags: i32,
    allotments: impl IntoIterator<Item = &'a LotAllotment>,
) -> i32 {
    let allotted: i32 = allotments
        .into_iter()
        .filter(|a| !a.is_closed)
        .map(|a| a.effective_bags(entry_bags))
        .sum();
    entry_bags - allotted
}

/// Validate a new allotment against the entry's bags.
///
/// `None` claims the whole entry and is only accepted while nothing is
/// allotted; an explicit count must be positive and fit in what is left.
pub fn check_allotment<'a>(
    entry_bags: i32,
    existing: impl IntoIterator<Item = &'a LotAllotment>,
    requested: Option<i32>,
) -> DomainResult<()> {
    let remaining = remaining_bags(entry_bags, existing);
    match requested {
        None if remaining == entry_bags => Ok(()),
        None => Err(DomainError::InvariantViolation(format!(
            "Cannot allot the entire entry: only {} of {} bags remain",
            remaining, entry_bags
        ))),
        Some(bags) if bags <= 0 => Err(DomainError::validation(
            "allotted_bags",
            "Allotted bags must be positive",
        )),
        Some(bags) if bags > remaining => Err(DomainError::InvariantViolation(format!(
            "Allotting {} bags exceeds the {} bags remaining",
            bags, remaining
        ))),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> StageStamp {
        StageStamp::new(Uuid::nil(), Utc::now())
    }

    fn lot(bags: Option<i32>) -> LotAllotment {
        LotAllotment::new(Uuid::nil(), Uuid::new_v4(), bags, stamp())
    }

    fn pass(lot: &LotAllotment, sequence: i32, bags: i32) -> PhysicalInspection {
        PhysicalInspection {
            id: Uuid::new_v4(),
            lot_id: lot.id,
            entry_id: lot.entry_id,
            sequence,
            inspected_bags: bags,
            cutting1: None,
            cutting2: None,
            moisture: None,
            remarks: None,
            is_complete: false,
            inspected: stamp(),
        }
    }

    #[test]
    fn test_remaining_ignores_closed_lots() {
        let open = lot(Some(40));
        let mut closed = lot(Some(30));
        closed.close("party short-delivered", 10, stamp()).unwrap();
        assert_eq!(remaining_bags(100, [&open, &closed]), 60);
    }

    #[test]
    fn test_null_allotment_claims_everything() {
        let all = lot(None);
        assert_eq!(remaining_bags(100, [&all]), 0);
        assert!(check_allotment(100, [&all], Some(1)).is_err());
    }

    #[test]
    fn test_null_allotment_only_when_untouched() {
        let part = lot(Some(10));
        assert!(check_allotment(100, std::iter::empty(), None).is_ok());
        assert!(matches!(
            check_allotment(100, [&part], None),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_allotment_over_remaining() {
        let part = lot(Some(70));
        assert!(check_allotment(100, [&part], Some(30)).is_ok());
        assert!(matches!(
            check_allotment(100, [&part], Some(31)),
            Err(DomainError::InvariantViolation(_))
        ));
        assert!(matches!(
            check_allotment(100, [&part], Some(0)),
            Err(DomainError::Validation { .. })
        ));
    }

    #[test]
    fn test_progress_folds_multiple_passes() {
        let l = lot(Some(50));
        let passes = vec![pass(&l, 1, 20), pass(&l, 2, 20)];
        let progress = LotProgress::fold(&l, 100, &passes);
        assert_eq!(progress.inspected_bags, 40);
        assert_eq!(progress.passes, 2);
        assert!(!progress.is_complete);
        assert_eq!(progress.check_pass(10).unwrap(), 50);
        assert!(progress.check_pass(11).is_err());

        let passes = vec![pass(&l, 1, 20), pass(&l, 2, 20), pass(&l, 3, 10)];
        assert!(LotProgress::fold(&l, 100, &passes).is_complete);
    }

    #[test]
    fn test_oversized_pass_after_partial_inspection() {
        let l = lot(Some(10));
        let passes = vec![pass(&l, 1, 5)];
        let progress = LotProgress::fold(&l, 100, &passes);
        assert!(matches!(
            progress.check_pass(i32::MAX),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(progress.check_pass(5).unwrap(), 10);
    }

    #[test]
    fn test_progress_ignores_other_lots() {
        let a = lot(Some(10));
        let b = lot(Some(10));
        let passes = vec![pass(&b, 1, 10)];
        assert_eq!(LotProgress::fold(&a, 100, &passes).inspected_bags, 0);
    }

    #[test]
    fn test_closed_lot_is_complete_and_frozen() {
        let mut l = lot(Some(50));
        l.close("fewer bags delivered", 20, stamp()).unwrap();
        let progress = LotProgress::fold(&l, 100, std::iter::empty());
        assert!(progress.is_complete);
        assert!(progress.check_pass(1).is_err());
    }

    #[test]
    fn test_close_requires_reason() {
        let mut l = lot(Some(50));
        assert!(l.close("   ", 0, stamp()).is_err());
        assert!(!l.is_closed);
        l.close("short", 0, stamp()).unwrap();
        assert!(l.close("again", 0, stamp()).is_err());
    }
}
