//! Stage completion rules
//!
//! Each phase names the data an entry must carry before it may leave that
//! phase, and the child records that leaving it produces. Everything here is
//! computed before anything is written.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    is_forward_edge, CookingReport, CookingReportInput, CookingStatus, EntryAggregate, FinancialCalculation,
    InventoryInput, LotProgress, LotSelectionDecision, OfferingInputs, QualityParameters,
    QualityReadings, RateTerms, SampleEntry, SampleEntryOffering, StageStamp, WorkflowPhase,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::ChildWrite;

/// Stage data submitted with a transition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionPayload {
    #[serde(default)]
    pub quality_parameters: Option<QualityReadings>,
    #[serde(default)]
    pub lot_selection: Option<LotSelectionDecision>,
    #[serde(default)]
    pub cooking_report: Option<CookingReportInput>,
    /// Pricing configuration at the final report, adjustments afterwards
    #[serde(default)]
    pub offering: Option<OfferingInputs>,
    #[serde(default)]
    pub inventory: Vec<InventoryInput>,
    #[serde(default)]
    pub rate_terms: Option<RateTerms>,
    /// Required to change a finalized offering at final review
    #[serde(default)]
    pub reopen_reason: Option<String>,
}

/// Everything a validated transition changes
#[derive(Debug, Default)]
pub struct StagePlan {
    pub decision: Option<LotSelectionDecision>,
    pub offering_price: Option<Decimal>,
    pub final_price: Option<Decimal>,
    pub writes: Vec<ChildWrite>,
}

impl StagePlan {
    pub fn apply_to(&self, entry: &mut SampleEntry) {
        if let Some(decision) = self.decision {
            entry.lot_selection_decision = Some(decision);
        }
        if let Some(price) = self.offering_price {
            entry.offering_price = Some(price);
        }
        if let Some(price) = self.final_price {
            entry.final_price = Some(price);
        }
    }
}

/// Check that `target` is the successor of `current`
pub fn check_successor(
    current: WorkflowPhase,
    target: WorkflowPhase,
    decision: Option<LotSelectionDecision>,
) -> AppResult<()> {
    if current != WorkflowPhase::LotSelection {
        return match current.linear_successor() {
            Some(next) if next == target => Ok(()),
            _ => Err(AppError::invalid_transition(current, target)),
        };
    }

    if !is_forward_edge(current, target) {
        return Err(AppError::invalid_transition(current, target));
    }
    let decision = decision.ok_or_else(|| AppError::incomplete(current, &["lot_selection"]))?;
    if decision.next_phase() != target {
        return Err(AppError::invalid_transition(current, target));
    }
    Ok(())
}

/// Validate the data required to leave the aggregate's current phase and
/// build the resulting writes
pub fn prepare(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let phase = aggregate.entry.workflow_status;
    match phase {
        WorkflowPhase::StaffEntry => staff_entry(aggregate),
        WorkflowPhase::QualityCheck => quality_check(aggregate, payload, stamp),
        WorkflowPhase::LotSelection => lot_selection(payload),
        WorkflowPhase::CookingReport => cooking_report(aggregate, payload, stamp),
        WorkflowPhase::FinalReport => final_report(aggregate, payload, stamp),
        WorkflowPhase::LotAllotment => lot_allotment(aggregate),
        WorkflowPhase::PhysicalInspection => physical_inspection(aggregate),
        WorkflowPhase::InventoryEntry => inventory_entry(aggregate, payload, stamp),
        WorkflowPhase::OwnerFinancial => owner_financial(aggregate, payload, stamp),
        WorkflowPhase::ManagerFinancial => manager_financial(aggregate, payload, stamp),
        WorkflowPhase::FinalReview => final_review(aggregate, payload, stamp),
        WorkflowPhase::Completed | WorkflowPhase::Failed => Err(AppError::InvalidTransition {
            current: phase.to_string(),
            attempted: "any".to_string(),
        }),
    }
}

fn staff_entry(aggregate: &EntryAggregate) -> AppResult<StagePlan> {
    let missing = aggregate.entry.missing_metadata();
    if !missing.is_empty() {
        return Err(AppError::IncompleteStageData {
            phase: WorkflowPhase::StaffEntry,
            missing,
        });
    }
    Ok(StagePlan::default())
}

fn quality_check(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let readings = payload
        .quality_parameters
        .ok_or_else(|| AppError::incomplete(WorkflowPhase::QualityCheck, &["quality_parameters"]))?;
    readings.validate()?;

    let quality = QualityParameters {
        id: aggregate.quality.as_ref().map_or_else(Uuid::new_v4, |q| q.id),
        entry_id: aggregate.entry.id,
        readings,
        recorded: stamp,
    };
    Ok(StagePlan {
        writes: vec![ChildWrite::Quality(quality)],
        ..Default::default()
    })
}

fn lot_selection(payload: TransitionPayload) -> AppResult<StagePlan> {
    let decision = payload
        .lot_selection
        .ok_or_else(|| AppError::incomplete(WorkflowPhase::LotSelection, &["lot_selection"]))?;
    Ok(StagePlan {
        decision: Some(decision),
        ..Default::default()
    })
}

fn cooking_report(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let input = payload
        .cooking_report
        .ok_or_else(|| AppError::incomplete(WorkflowPhase::CookingReport, &["cooking_report"]))?;
    if input.status != CookingStatus::Pass {
        return Err(AppError::InvariantViolation(format!(
            "A {} cooking report cannot advance the entry; record a passing report or reject it",
            input.status
        )));
    }

    let report = CookingReport {
        id: aggregate.cooking.as_ref().map_or_else(Uuid::new_v4, |c| c.id),
        entry_id: aggregate.entry.id,
        status: input.status,
        remarks: input.remarks,
        recorded: stamp,
    };
    Ok(StagePlan {
        writes: vec![ChildWrite::Cooking(report)],
        ..Default::default()
    })
}

fn final_report(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let offering = match (aggregate.offering.clone(), payload.offering) {
        (Some(mut existing), Some(inputs)) => {
            existing.apply(inputs, stamp)?;
            existing
        }
        (None, Some(inputs)) => SampleEntryOffering::new(aggregate.entry.id, inputs, stamp)?,
        (Some(existing), None) => existing,
        (None, None) => {
            return Err(AppError::incomplete(WorkflowPhase::FinalReport, &["offering"]));
        }
    };

    Ok(StagePlan {
        offering_price: Some(offering.live.final_price),
        writes: vec![ChildWrite::Offering(offering)],
        ..Default::default()
    })
}

fn lot_allotment(aggregate: &EntryAggregate) -> AppResult<StagePlan> {
    if aggregate.active_allotments().next().is_none() {
        return Err(AppError::incomplete(WorkflowPhase::LotAllotment, &["lot_allotments"]));
    }
    Ok(StagePlan::default())
}

fn physical_inspection(aggregate: &EntryAggregate) -> AppResult<StagePlan> {
    let pending: Vec<String> = aggregate
        .active_allotments()
        .map(|lot| LotProgress::fold(lot, aggregate.entry.bags, &aggregate.inspections))
        .filter(|progress| !progress.is_complete)
        .map(|progress| format!("lot {} has {} bags left", progress.lot_id, progress.remaining()))
        .collect();
    if !pending.is_empty() {
        return Err(AppError::InvariantViolation(format!(
            "Every lot must be fully inspected or closed: {}",
            pending.join("; ")
        )));
    }
    Ok(StagePlan::default())
}

fn inventory_entry(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let mut missing = Vec::new();
    if payload.rate_terms.is_none() {
        missing.push("rate_terms".to_string());
    }

    for input in &payload.inventory {
        if !aggregate.inspections.iter().any(|i| i.id == input.inspection_id) {
            return Err(AppError::Validation {
                field: "inventory.inspection_id".to_string(),
                message: format!("Inspection {} does not belong to this entry", input.inspection_id),
            });
        }
        if aggregate.inventory_for(input.inspection_id).is_some() {
            return Err(AppError::InvariantViolation(format!(
                "Inspection {} already has inventory recorded",
                input.inspection_id
            )));
        }
        if payload
            .inventory
            .iter()
            .filter(|other| other.inspection_id == input.inspection_id)
            .count()
            > 1
        {
            return Err(AppError::InvariantViolation(format!(
                "Inventory for inspection {} was submitted more than once",
                input.inspection_id
            )));
        }
        input.validate()?;
    }

    for inspection in &aggregate.inspections {
        let covered = aggregate.inventory_for(inspection.id).is_some()
            || payload.inventory.iter().any(|i| i.inspection_id == inspection.id);
        if !covered {
            missing.push(format!("inventory[{}]", inspection.id));
        }
    }

    let terms = match payload.rate_terms {
        Some(terms) if missing.is_empty() => terms,
        _ => {
            return Err(AppError::IncompleteStageData {
                phase: WorkflowPhase::InventoryEntry,
                missing,
            })
        }
    };

    let entry_id = aggregate.entry.id;
    let mut records: Vec<_> = aggregate.inventory.clone();
    let mut writes = Vec::new();
    for input in payload.inventory {
        let record = input.into_record(entry_id, stamp)?;
        writes.push(ChildWrite::Inventory(record.clone()));
        records.push(record);
    }

    for record in &records {
        if aggregate.financial_for(record.id).is_some() {
            continue;
        }
        let bags = aggregate
            .inspections
            .iter()
            .find(|i| i.id == record.inspection_id)
            .map(|i| i.inspected_bags)
            .ok_or_else(|| {
                AppError::InvariantViolation(format!(
                    "Inventory {} refers to a missing inspection",
                    record.id
                ))
            })?;
        let calculation = FinancialCalculation::compute(record, bags, terms.clone(), stamp)?;
        writes.push(ChildWrite::Financial(calculation));
    }

    Ok(StagePlan {
        writes,
        ..Default::default()
    })
}

fn owner_financial(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let Some(terms) = payload.rate_terms else {
        return Ok(StagePlan::default());
    };

    let mut writes = Vec::with_capacity(aggregate.financials.len());
    for calculation in &aggregate.financials {
        let mut calculation = calculation.clone();
        calculation.recalculate(terms.clone(), stamp)?;
        writes.push(ChildWrite::Financial(calculation));
    }
    Ok(StagePlan {
        writes,
        ..Default::default()
    })
}

fn manager_financial(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let mut offering = aggregate
        .offering
        .clone()
        .ok_or_else(|| AppError::incomplete(WorkflowPhase::ManagerFinancial, &["offering"]))?;
    if let Some(inputs) = payload.offering {
        offering.apply(inputs, stamp)?;
    }
    let final_price = offering.finalize(stamp)?;

    Ok(StagePlan {
        offering_price: Some(offering.live.final_price),
        final_price: Some(final_price),
        writes: vec![ChildWrite::Offering(offering)],
        ..Default::default()
    })
}

fn final_review(
    aggregate: &EntryAggregate,
    payload: TransitionPayload,
    stamp: StageStamp,
) -> AppResult<StagePlan> {
    let mut offering = aggregate
        .offering
        .clone()
        .ok_or_else(|| AppError::incomplete(WorkflowPhase::FinalReview, &["offering"]))?;
    if !offering.is_finalized {
        return Err(AppError::InvariantViolation(
            "The offering must be finalized before final review".to_string(),
        ));
    }

    let inputs = match (payload.offering, payload.reopen_reason) {
        (None, None) => return Ok(StagePlan::default()),
        (None, Some(_)) => {
            return Err(AppError::Validation {
                field: "offering".to_string(),
                message: "A re-open reason was given without offering changes".to_string(),
            })
        }
        (Some(_), None) => {
            return Err(AppError::AlreadyFinalized(format!(
                "Offering {} is finalized; give a reopen_reason to change it",
                offering.id
            )))
        }
        (Some(inputs), Some(reason)) => {
            offering.reopen(&reason, stamp)?;
            inputs
        }
    };

    offering.apply(inputs, stamp)?;
    let final_price = offering.finalize(stamp)?;
    Ok(StagePlan {
        offering_price: Some(offering.live.final_price),
        final_price: Some(final_price),
        writes: vec![ChildWrite::Offering(offering)],
        ..Default::default()
    })
}
