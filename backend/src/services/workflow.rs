//! Workflow service: moves sample entries through their phases

use std::sync::Arc;

use shared::{
    is_rejection_edge, validate_reason, Action, Actor, CreateSampleEntryInput, EntryAggregate, PermissionMatrix,
    Resource, SampleEntry, StageStamp, WorkflowPhase,
};
use uuid::Uuid;
use validator::Validate;

use super::locks::EntryLocks;
use super::stage::{self, TransitionPayload};
use crate::cache::{notify, CacheInvalidator, EventKind, WorkflowEvent};
use crate::error::{AppError, AppResult};
use crate::store::{EntryStore, ExpectedState};

/// Workflow service owning every `workflow_status` change
#[derive(Clone)]
pub struct WorkflowService {
    store: Arc<dyn EntryStore>,
    permissions: Arc<PermissionMatrix>,
    cache: Arc<dyn CacheInvalidator>,
    locks: EntryLocks,
}

impl WorkflowService {
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

    /// Register a new sample entry in `STAFF_ENTRY`
    #[tracing::instrument(skip(self, input), fields(role = %actor.role))]
    pub async fn create_entry(&self, actor: Actor, input: CreateSampleEntryInput) -> AppResult<SampleEntry> {
        if !self
            .permissions
            .can_perform_action(actor.role, Action::Create, Resource::SampleEntry)
        {
            return Err(AppError::permission_denied(actor.role, "create sample entries"));
        }
        input.validate()?;

        let entry = SampleEntry::new(input, StageStamp::now(&actor));
        self.store.insert_entry(&entry).await?;
        tracing::info!(entry_id = %entry.id, bags = entry.bags, "Sample entry created");

        notify(
            &self.cache,
            WorkflowEvent::new(
                EventKind::EntryCreated,
                entry.id,
                entry.workflow_status,
                entry.workflow_status,
                actor,
            ),
        )
        .await;
        Ok(entry)
    }

    /// Load an entry with its child records
    pub async fn get_entry(&self, actor: Actor, entry_id: Uuid) -> AppResult<EntryAggregate> {
        if !self
            .permissions
            .can_perform_action(actor.role, Action::Read, Resource::SampleEntry)
        {
            return Err(AppError::permission_denied(actor.role, "read sample entries"));
        }
        self.load(entry_id).await
    }

    /// Advance an entry from its current phase to `target`.
    ///
    /// Checks run in order: terminal phase, actor permission on the current
    /// phase, successor edge, stage data. Nothing is written unless all pass.
    #[tracing::instrument(skip(self, payload), fields(role = %actor.role))]
    pub async fn transition(
        &self,
        entry_id: Uuid,
        actor: Actor,
        target: WorkflowPhase,
        payload: TransitionPayload,
    ) -> AppResult<SampleEntry> {
        let _guard = self.locks.acquire(entry_id).await;
        let aggregate = self.load(entry_id).await?;
        let current = aggregate.entry.workflow_status;

        if current.is_terminal() {
            return Err(AppError::invalid_transition(current, target));
        }
        if !self.permissions.can_access_workflow_phase(actor.role, current) {
            return Err(AppError::permission_denied(
                actor.role,
                format!("advance entries in {}", current),
            ));
        }
        stage::check_successor(current, target, payload.lot_selection)?;

        let stamp = StageStamp::now(&actor);
        let plan = stage::prepare(&aggregate, payload, stamp)?;

        let expected = ExpectedState::of(&aggregate.entry);
        let mut entry = aggregate.entry;
        plan.apply_to(&mut entry);
        entry.decisions.stamp(current, stamp);
        entry.workflow_status = target;
        entry.touch(stamp);

        self.store.save_transaction(expected, &entry, &plan.writes).await?;
        tracing::info!(
            from = %current,
            to = %target,
            child_writes = plan.writes.len(),
            "Sample entry advanced"
        );

        notify(
            &self.cache,
            WorkflowEvent::new(EventKind::Transitioned, entry_id, current, target, actor),
        )
        .await;
        Ok(entry)
    }

    /// Explicitly reject an entry from any non-terminal phase
    #[tracing::instrument(skip(self, reason), fields(role = %actor.role))]
    pub async fn reject(&self, entry_id: Uuid, actor: Actor, reason: &str) -> AppResult<SampleEntry> {
        let _guard = self.locks.acquire(entry_id).await;
        let aggregate = self.load(entry_id).await?;
        let current = aggregate.entry.workflow_status;

        if !is_rejection_edge(current, WorkflowPhase::Failed) {
            return Err(AppError::invalid_transition(current, WorkflowPhase::Failed));
        }
        if !self.permissions.can_access_workflow_phase(actor.role, current) {
            return Err(AppError::permission_denied(
                actor.role,
                format!("reject entries in {}", current),
            ));
        }
        if reason.trim().is_empty() {
            return Err(AppError::incomplete(current, &["reason"]));
        }
        validate_reason(reason).map_err(|m| AppError::Validation {
            field: "reason".to_string(),
            message: m.to_string(),
        })?;

        let stamp = StageStamp::now(&actor);
        let expected = ExpectedState::of(&aggregate.entry);
        let mut entry = aggregate.entry;
        entry.rejection_reason = Some(reason.trim().to_string());
        entry.decisions.stamp(WorkflowPhase::Failed, stamp);
        entry.workflow_status = WorkflowPhase::Failed;
        entry.touch(stamp);

        self.store.save_transaction(expected, &entry, &[]).await?;
        tracing::info!(from = %current, "Sample entry rejected");

        notify(
            &self.cache,
            WorkflowEvent::new(EventKind::Rejected, entry_id, current, WorkflowPhase::Failed, actor),
        )
        .await;
        Ok(entry)
    }

    async fn load(&self, entry_id: Uuid) -> AppResult<EntryAggregate> {
        self.store
            .load(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Sample entry {}", entry_id)))
    }
}
