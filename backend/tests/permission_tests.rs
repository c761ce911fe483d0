//! Permission enforcement tests
//!
//! The engine refuses a transition with PERMISSION_DENIED exactly when the
//! matrix denies the actor's role the entry's current phase.

mod common;

use std::sync::Arc;

use common::*;
use mill_workflow::cache::NoopInvalidator;
use mill_workflow::services::TransitionPayload;
use mill_workflow::store::MemoryStore;
use mill_workflow::{AppError, AppState, Config};
use shared::{
    CookingStatus, LotSelectionDecision, PermissionMatrix, RecordInspectionInput, SampleEntry,
    UserRole, WorkflowPhase,
};
use uuid::Uuid;

/// Attempt a transition no phase allows so nothing is written; the only
/// question is which check refuses it first
async fn assert_phase_gate(state: &AppState, entry: &SampleEntry) {
    let phase = entry.workflow_status;
    for role in UserRole::ALL {
        let err = state
            .workflow
            .transition(entry.id, actor(role), WorkflowPhase::Completed, TransitionPayload::default())
            .await
            .unwrap_err();
        let allowed = state.permissions.can_access_workflow_phase(role, phase);
        match (&err, allowed) {
            (AppError::PermissionDenied { .. }, false) => {}
            (AppError::InvalidTransition { .. }, true) => {}
            (other, allowed) => panic!(
                "{} at {} (allowed: {}) gave {:?}",
                role, phase, allowed, other
            ),
        }
    }
}

// ============================================================================
// Phase gate
// ============================================================================

#[tokio::test]
async fn test_phase_gate_at_staff_entry() {
    let (state, _store) = state();
    let entry = state
        .workflow
        .create_entry(actor(UserRole::Staff), entry_input(10))
        .await
        .unwrap();
    assert_phase_gate(&state, &entry).await;
}

#[tokio::test]
async fn test_phase_gate_at_lot_selection() {
    let (state, _store) = state();
    let entry = entry_at_lot_selection(&state, 10).await;
    assert_phase_gate(&state, &entry).await;
}

#[tokio::test]
async fn test_phase_gate_at_lot_allotment() {
    let (state, _store) = state();
    let entry = entry_at_lot_allotment(&state, 10).await;
    assert_phase_gate(&state, &entry).await;
}

#[tokio::test]
async fn test_create_needs_its_own_grant() {
    let (state, _store) = state();
    let err = state
        .workflow
        .create_entry(actor(UserRole::InventoryStaff), entry_input(10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied { .. }));
    assert_eq!(err.code(), "PERMISSION_DENIED");

    let entry = state
        .workflow
        .create_entry(actor(UserRole::Staff), entry_input(10))
        .await
        .unwrap();
    assert!(state
        .workflow
        .get_entry(actor(UserRole::InventoryStaff), entry.id)
        .await
        .is_ok());
}

// ============================================================================
// Every live phase
// ============================================================================

/// Stage data for the legal move out of `phase`, after doing whatever lot
/// work the phase needs
async fn prepare_exit(
    state: &AppState,
    entry_id: Uuid,
    phase: WorkflowPhase,
) -> (WorkflowPhase, TransitionPayload) {
    let manager = actor(UserRole::Manager);
    let physical = actor(UserRole::PhysicalSupervisor);
    match phase {
        WorkflowPhase::StaffEntry => (WorkflowPhase::QualityCheck, TransitionPayload::default()),
        WorkflowPhase::QualityCheck => (WorkflowPhase::LotSelection, with_quality()),
        WorkflowPhase::LotSelection => (
            WorkflowPhase::CookingReport,
            with_decision(LotSelectionDecision::PassWithCooking),
        ),
        WorkflowPhase::CookingReport => {
            (WorkflowPhase::FinalReport, with_cooking(CookingStatus::Pass))
        }
        WorkflowPhase::FinalReport => (WorkflowPhase::LotAllotment, with_offering()),
        WorkflowPhase::LotAllotment => {
            state
                .lots
                .allot_lot(entry_id, manager, physical.user_id, None)
                .await
                .unwrap();
            (WorkflowPhase::PhysicalInspection, TransitionPayload::default())
        }
        WorkflowPhase::PhysicalInspection => {
            let aggregate = state.workflow.get_entry(manager, entry_id).await.unwrap();
            let input = RecordInspectionInput {
                inspected_bags: aggregate.entry.bags,
                cutting1: None,
                cutting2: None,
                moisture: None,
                remarks: None,
            };
            state
                .lots
                .record_inspection(aggregate.allotments[0].id, physical, input)
                .await
                .unwrap();
            (WorkflowPhase::InventoryEntry, TransitionPayload::default())
        }
        WorkflowPhase::InventoryEntry => {
            let aggregate = state.workflow.get_entry(manager, entry_id).await.unwrap();
            let payload = TransitionPayload {
                inventory: aggregate.inspections.iter().map(|i| inventory_for(i.id)).collect(),
                rate_terms: Some(rate_terms()),
                ..Default::default()
            };
            (WorkflowPhase::OwnerFinancial, payload)
        }
        WorkflowPhase::OwnerFinancial => {
            (WorkflowPhase::ManagerFinancial, TransitionPayload::default())
        }
        WorkflowPhase::ManagerFinancial => {
            (WorkflowPhase::FinalReview, TransitionPayload::default())
        }
        WorkflowPhase::FinalReview => (WorkflowPhase::Completed, TransitionPayload::default()),
        terminal => panic!("{} has no exit", terminal),
    }
}

#[tokio::test]
async fn test_transition_succeeds_exactly_for_roles_with_phase_access() {
    let matrix = PermissionMatrix::mill_default();
    let rounds = WorkflowPhase::ALL
        .iter()
        .map(|p| matrix.roles_for_phase(*p).len())
        .max()
        .unwrap();

    // Each round hands every phase to a different allowed role
    for round in 0..rounds {
        let (state, _store) = state();
        let admin = actor(UserRole::Admin);
        let entry = state
            .workflow
            .create_entry(actor(UserRole::Staff), entry_input(40))
            .await
            .unwrap();

        let mut phase = entry.workflow_status;
        while !phase.is_terminal() {
            let (target, payload) = prepare_exit(&state, entry.id, phase).await;
            let allowed = state.permissions.roles_for_phase(phase);
            assert!(!allowed.is_empty(), "nobody owns {}", phase);

            for role in UserRole::ALL.into_iter().filter(|r| !allowed.contains(r)) {
                let err = state
                    .workflow
                    .transition(entry.id, actor(role), target, payload.clone())
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, AppError::PermissionDenied { .. }),
                    "{} at {} gave {:?}",
                    role,
                    phase,
                    err
                );
            }
            let unchanged = state.workflow.get_entry(admin, entry.id).await.unwrap();
            assert_eq!(unchanged.entry.workflow_status, phase);

            let role = allowed[round % allowed.len()];
            let moved = state
                .workflow
                .transition(entry.id, actor(role), target, payload)
                .await
                .unwrap_or_else(|e| panic!("{} at {} gave {:?}", role, phase, e));
            assert_eq!(moved.workflow_status, target);
            phase = target;
        }
        assert_eq!(phase, WorkflowPhase::Completed);
    }
}

// ============================================================================
// Loaded matrices
// ============================================================================

#[tokio::test]
async fn test_loaded_matrix_replaces_defaults() {
    let mut document = serde_json::to_value(PermissionMatrix::mill_default()).unwrap();
    document["staff"]["can_transition"] = serde_json::json!([]);
    let matrix = PermissionMatrix::from_json(&document.to_string()).unwrap();
    assert!(!matrix.can_access_workflow_phase(UserRole::Staff, WorkflowPhase::StaffEntry));

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(Config::default(), matrix, store, Arc::new(NoopInvalidator));
    let staff = actor(UserRole::Staff);
    let entry = state.workflow.create_entry(staff, entry_input(10)).await.unwrap();

    let err = state
        .workflow
        .transition(entry.id, staff, WorkflowPhase::QualityCheck, TransitionPayload::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied { .. }));

    // Admin keeps every phase
    state
        .workflow
        .transition(entry.id, actor(UserRole::Admin), WorkflowPhase::QualityCheck, TransitionPayload::default())
        .await
        .unwrap();
}

#[test]
fn test_every_role_has_a_row_and_only_admin_sees_everything() {
    let matrix = PermissionMatrix::mill_default();
    for role in UserRole::ALL {
        let phases: Vec<_> = WorkflowPhase::ALL
            .into_iter()
            .filter(|p| matrix.can_access_workflow_phase(role, *p))
            .collect();
        assert!(!phases.is_empty(), "{} owns no phase", role);
        let live = WorkflowPhase::ALL.iter().filter(|p| !p.is_terminal()).count();
        assert_eq!(phases.len() == live, role == UserRole::Admin, "{}", role);
    }
}
