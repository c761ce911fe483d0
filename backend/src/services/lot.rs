//! Lot service: allotments, inspection passes and early closure

use std::sync::Arc;

use shared::{
    check_allotment, validate_bags, validate_moisture_content, validate_percentage, Action, Actor,
    EntryAggregate, LotAllotment, LotProgress, PermissionMatrix, PhysicalInspection,
    RecordInspectionInput, Resource, StageStamp, WorkflowPhase,
};
use uuid::Uuid;

use super::locks::EntryLocks;
use crate::cache::{notify, CacheInvalidator, EventKind, WorkflowEvent};
use crate::error::{AppError, AppResult};
use crate::store::{ChildWrite, EntryStore, ExpectedState};

/// Lot service for the allotment and physical inspection sub-pipeline
#[derive(Clone)]
pub struct LotService {
    store: Arc<dyn EntryStore>,
    permissions: Arc<PermissionMatrix>,
    cache: Arc<dyn CacheInvalidator>,
    locks: EntryLocks,
}

impl LotService {
    pub fn new(
        store: Arc<dyn EntryStore>,
        permissions: Arc<PermissionMatrix>,
        cache: Arc<dyn CacheInvalidator>,
        locks: EntryLocks,
    ) -> Self {
        Self {
            store,
            permissions,
            cache,
            locks,
        }
    }

    /// Allot part (or, when `allotted_bags` is `None`, all) of an entry to a
    /// physical supervisor
    #[tracing::instrument(skip(self), fields(role = %actor.role))]
    pub async fn allot_lot(
        &self,
        entry_id: Uuid,
        actor: Actor,
        supervisor_id: Uuid,
        allotted_bags: Option<i32>,
    ) -> AppResult<LotAllotment> {
        self.require(actor, Action::Create, Resource::LotAllotment, "allot lots")?;

        let _guard = self.locks.acquire(entry_id).await;
        let aggregate = self.load(entry_id).await?;
        require_phase(&aggregate, "allot_lot", &[WorkflowPhase::LotAllotment])?;
        check_allotment(aggregate.entry.bags, &aggregate.allotments, allotted_bags)?;

        let stamp = StageStamp::now(&actor);
        let lot = LotAllotment::new(entry_id, supervisor_id, allotted_bags, stamp);
        self.save(aggregate, stamp, vec![ChildWrite::Allotment(lot.clone())])
            .await?;

        tracing::info!(lot_id = %lot.id, bags = ?allotted_bags, "Lot allotted");
        self.emit(EventKind::LotAllotted, entry_id, WorkflowPhase::LotAllotment, actor)
            .await;
        Ok(lot)
    }

    /// Append an inspection pass to a lot
    #[tracing::instrument(skip(self, input), fields(role = %actor.role, bags = input.inspected_bags))]
    pub async fn record_inspection(
        &self,
        lot_id: Uuid,
        actor: Actor,
        input: RecordInspectionInput,
    ) -> AppResult<PhysicalInspection> {
        self.require(
            actor,
            Action::Create,
            Resource::PhysicalInspection,
            "record inspections",
        )?;
        validate_inspection(&input)?;

        let entry_id = self.entry_of(lot_id).await?;
        let _guard = self.locks.acquire(entry_id).await;
        let aggregate = self.load(entry_id).await?;
        require_phase(
            &aggregate,
            "record_inspection",
            &[WorkflowPhase::PhysicalInspection],
        )?;
        let lot = lot_in(&aggregate, lot_id)?;

        let progress = LotProgress::fold(lot, aggregate.entry.bags, &aggregate.inspections);
        let inspected_total = progress.check_pass(input.inspected_bags)?;
        let is_complete = inspected_total >= progress.allotted_bags;
        let stamp = StageStamp::now(&actor);
        let inspection = PhysicalInspection {
            id: Uuid::new_v4(),
            lot_id,
            entry_id,
            sequence: progress.passes + 1,
            inspected_bags: input.inspected_bags,
            cutting1: input.cutting1,
            cutting2: input.cutting2,
            moisture: input.moisture,
            remarks: input.remarks,
            is_complete,
            inspected: stamp,
        };

        let mut writes = vec![ChildWrite::Inspection(inspection.clone())];
        if is_complete {
            let mut lot = lot.clone();
            lot.inspected_bags = Some(inspected_total);
            writes.push(ChildWrite::Allotment(lot));
        }
        self.save(aggregate, stamp, writes).await?;

        tracing::info!(
            lot_id = %lot_id,
            sequence = inspection.sequence,
            complete = is_complete,
            "Inspection recorded"
        );
        self.emit(
            EventKind::InspectionRecorded,
            entry_id,
            WorkflowPhase::PhysicalInspection,
            actor,
        )
        .await;
        Ok(inspection)
    }

    /// Close a lot before it is fully inspected. The reason is checked before
    /// anything is read or written.
    #[tracing::instrument(skip(self, reason), fields(role = %actor.role))]
    pub async fn close_lot(&self, lot_id: Uuid, actor: Actor, reason: &str) -> AppResult<LotAllotment> {
        if reason.trim().is_empty() {
            return Err(AppError::InvariantViolation(
                "A lot can only be closed with a reason".to_string(),
            ));
        }
        self.require(actor, Action::Update, Resource::LotAllotment, "close lots")?;

        let entry_id = self.entry_of(lot_id).await?;
        let _guard = self.locks.acquire(entry_id).await;
        let aggregate = self.load(entry_id).await?;
        let phase = require_phase(
            &aggregate,
            "close_lot",
            &[WorkflowPhase::LotAllotment, WorkflowPhase::PhysicalInspection],
        )?;

        let mut lot = lot_in(&aggregate, lot_id)?.clone();
        let progress = LotProgress::fold(&lot, aggregate.entry.bags, &aggregate.inspections);
        let stamp = StageStamp::now(&actor);
        lot.close(reason, progress.inspected_bags, stamp)?;

        self.save(aggregate, stamp, vec![ChildWrite::Allotment(lot.clone())])
            .await?;

        tracing::info!(
            lot_id = %lot_id,
            inspected = progress.inspected_bags,
            allotted = progress.allotted_bags,
            "Lot closed early"
        );
        self.emit(EventKind::LotClosed, entry_id, phase, actor).await;
        Ok(lot)
    }

    /// Inspection progress of a lot
    pub async fn lot_progress(&self, lot_id: Uuid, actor: Actor) -> AppResult<LotProgress> {
        self.require(actor, Action::Read, Resource::LotAllotment, "read lots")?;
        let entry_id = self.entry_of(lot_id).await?;
        let aggregate = self.load(entry_id).await?;
        let lot = lot_in(&aggregate, lot_id)?;
        Ok(LotProgress::fold(lot, aggregate.entry.bags, &aggregate.inspections))
    }

    fn require(&self, actor: Actor, action: Action, resource: Resource, what: &str) -> AppResult<()> {
        if self.permissions.can_perform_action(actor.role, action, resource) {
            Ok(())
        } else {
            Err(AppError::permission_denied(actor.role, what))
        }
    }

    async fn entry_of(&self, lot_id: Uuid) -> AppResult<Uuid> {
        self.store
            .find_lot(lot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))
    }

    async fn load(&self, entry_id: Uuid) -> AppResult<EntryAggregate> {
        self.store
            .load(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sample entry {}", entry_id)))
    }

    /// Child records still bump the entry version so concurrent writers
    /// conflict
    async fn save(&self, aggregate: EntryAggregate, stamp: StageStamp, writes: Vec<ChildWrite>) -> AppResult<()> {
        let expected = ExpectedState::of(&aggregate.entry);
        let mut entry = aggregate.entry;
        entry.touch(stamp);
        self.store.save_transaction(expected, &entry, &writes).await
    }

    async fn emit(&self, kind: EventKind, entry_id: Uuid, phase: WorkflowPhase, actor: Actor) {
        notify(
            &self.cache,
            WorkflowEvent::new(kind, entry_id, phase, phase, actor),
        )
        .await;
    }
}

fn require_phase(
    aggregate: &EntryAggregate,
    operation: &str,
    allowed: &[WorkflowPhase],
) -> AppResult<WorkflowPhase> {
    let current = aggregate.entry.workflow_status;
    if allowed.contains(&current) {
        Ok(current)
    } else {
        Err(AppError::wrong_phase(operation, current))
    }
}

fn lot_in(aggregate: &EntryAggregate, lot_id: Uuid) -> AppResult<&LotAllotment> {
    aggregate
        .allotment(lot_id)
        .ok_or_else(|| AppError::NotFound(format!("Lot {}", lot_id)))
}

fn validate_inspection(input: &RecordInspectionInput) -> AppResult<()> {
    validate_bags(input.inspected_bags).map_err(|m| AppError::Validation {
        field: "inspected_bags".to_string(),
        message: m.to_string(),
    })?;
    if let Some(moisture) = input.moisture {
        validate_moisture_content(moisture).map_err(|m| AppError::Validation {
            field: "moisture".to_string(),
            message: m.to_string(),
        })?;
    }
    for (field, value) in [("cutting1", input.cutting1), ("cutting2", input.cutting2)] {
        if let Some(value) = value {
            validate_percentage(value).map_err(|m| AppError::Validation {
                field: field.to_string(),
                message: m.to_string(),
            })?;
        }
    }
    Ok(())
}
