//! Fixtures shared by the engine integration tests

#![allow(dead_code)]

use std::sync::Arc;

use mill_workflow::cache::{CacheInvalidator, NoopInvalidator};
use mill_workflow::services::TransitionPayload;
use mill_workflow::store::MemoryStore;
use mill_workflow::{AppState, Config};
use rust_decimal_macros::dec;
use shared::{
    Actor, Bearer, CookingReportInput, CookingStatus, CreateSampleEntryInput, InventoryInput,
    LotSelectionDecision, OfferingComponent, OfferingInputs, PermissionMatrix, PriceUnit,
    QualityReadings, RateMethod, RateTerms, RateType, SampleEntry, UserRole, WorkflowPhase,
};
use uuid::Uuid;

pub fn actor(role: UserRole) -> Actor {
    Actor::new(Uuid::new_v4(), role)
}

pub fn state_with(store: Arc<MemoryStore>, cache: Arc<dyn CacheInvalidator>) -> AppState {
    AppState::new(Config::default(), PermissionMatrix::mill_default(), store, cache)
}

pub fn state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (state_with(store.clone(), Arc::new(NoopInvalidator)), store)
}

pub fn entry_input(bags: i32) -> CreateSampleEntryInput {
    CreateSampleEntryInput {
        broker_name: "Ravi Traders".to_string(),
        party_name: "Lakshmi Farms".to_string(),
        variety: "Sona Masuri".to_string(),
        bags,
        packaging: Default::default(),
        collection_source: Default::default(),
        location: None,
    }
}

pub fn readings() -> QualityReadings {
    QualityReadings {
        moisture: dec!(13.2),
        cutting1: dec!(18),
        cutting2: dec!(21),
        bend: Some(dec!(2)),
        broken: Some(dec!(4.5)),
        mix: None,
        sk: None,
        lustre: Some("good".to_string()),
        grams_per_100_grains: Some(dec!(1.6)),
        remarks: None,
    }
}

/// 2200 per quintal less a party-borne hamali of 15 per quintal
pub fn offering() -> OfferingInputs {
    OfferingInputs {
        base_rate: dec!(2200),
        base_unit: PriceUnit::PerQuintal,
        bag_weight_kg: dec!(75),
        sute: OfferingComponent::default(),
        hamali: OfferingComponent::enabled(dec!(15), PriceUnit::PerQuintal, Bearer::Party),
        brokerage: OfferingComponent::enabled(dec!(10), PriceUnit::PerQuintal, Bearer::Mill),
        lf: OfferingComponent::default(),
        egb: OfferingComponent::default(),
        quantity_bags: None,
    }
}

pub fn rate_terms() -> RateTerms {
    RateTerms {
        rate_type: RateType::Cdl,
        sute: Default::default(),
        sute_method: RateMethod::PerBag,
        base_rate: dec!(2000),
        base_rate_method: RateMethod::PerQuintal,
        h: Default::default(),
        h_method: RateMethod::PerBag,
        b: Default::default(),
        b_method: RateMethod::PerQuintal,
        lf: Default::default(),
        lf_method: RateMethod::PerBag,
        egb: Default::default(),
    }
}

pub fn inventory_for(inspection_id: Uuid) -> InventoryInput {
    InventoryInput {
        inspection_id,
        gross_weight: dec!(2300),
        tare_weight: dec!(50),
        location: "Godown 2".to_string(),
        variety: "Sona Masuri".to_string(),
    }
}

pub fn with_quality() -> TransitionPayload {
    TransitionPayload {
        quality_parameters: Some(readings()),
        ..Default::default()
    }
}

pub fn with_decision(decision: LotSelectionDecision) -> TransitionPayload {
    TransitionPayload {
        lot_selection: Some(decision),
        ..Default::default()
    }
}

pub fn with_cooking(status: CookingStatus) -> TransitionPayload {
    TransitionPayload {
        cooking_report: Some(CookingReportInput {
            status,
            remarks: None,
        }),
        ..Default::default()
    }
}

pub fn with_offering() -> TransitionPayload {
    TransitionPayload {
        offering: Some(offering()),
        ..Default::default()
    }
}

/// Create an entry and walk it to LOT_SELECTION
pub async fn entry_at_lot_selection(state: &AppState, bags: i32) -> SampleEntry {
    let staff = actor(UserRole::Staff);
    let quality = actor(UserRole::QualitySupervisor);
    let entry = state.workflow.create_entry(staff, entry_input(bags)).await.unwrap();
    state
        .workflow
        .transition(entry.id, staff, WorkflowPhase::QualityCheck, TransitionPayload::default())
        .await
        .unwrap();
    state
        .workflow
        .transition(entry.id, quality, WorkflowPhase::LotSelection, with_quality())
        .await
        .unwrap()
}

/// Create an entry and walk it to LOT_ALLOTMENT without a cooking report
pub async fn entry_at_lot_allotment(state: &AppState, bags: i32) -> SampleEntry {
    let manager = actor(UserRole::Manager);
    let entry = entry_at_lot_selection(state, bags).await;
    state
        .workflow
        .transition(
            entry.id,
            manager,
            WorkflowPhase::FinalReport,
            with_decision(LotSelectionDecision::PassWithoutCooking),
        )
        .await
        .unwrap();
    state
        .workflow
        .transition(entry.id, manager, WorkflowPhase::LotAllotment, with_offering())
        .await
        .unwrap()
}
