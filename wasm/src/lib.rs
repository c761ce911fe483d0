//! WebAssembly module for the rice mill sample workflow
//!
//! Lets entry forms preview what the engine will compute:
//! - Purchase rate and offering price calculations
//! - Permission checks against the mill's role table
//! - The next workflow phase of an entry

use shared::{
    calculate_offering_price, calculate_purchase_rate, successor, Action, LotSelectionDecision,
    OfferingInputs, PermissionMatrix, PurchaseRateInputs, Resource, UserRole, WorkflowPhase,
};
use wasm_bindgen::prelude::*;

fn purchase_rate_json(inputs_json: &str) -> Result<String, String> {
    let inputs: PurchaseRateInputs =
        serde_json::from_str(inputs_json).map_err(|e| format!("Invalid inputs JSON: {}", e))?;
    let result = calculate_purchase_rate(&inputs).map_err(|e| e.to_string())?;
    serde_json::to_string(&result).map_err(|e| e.to_string())
}

fn offering_price_json(inputs_json: &str) -> Result<String, String> {
    let inputs: OfferingInputs =
        serde_json::from_str(inputs_json).map_err(|e| format!("Invalid inputs JSON: {}", e))?;
    let price = calculate_offering_price(&inputs).map_err(|e| e.to_string())?;
    serde_json::to_string(&price).map_err(|e| e.to_string())
}

fn next_phase(phase: &str, decision: Option<String>) -> Option<String> {
    let current = WorkflowPhase::from_str(phase)?;
    let decision = match decision {
        Some(d) => Some(serde_json::from_value::<LotSelectionDecision>(serde_json::Value::String(d)).ok()?),
        None => None,
    };
    successor(current, decision).map(|p| p.as_str().to_string())
}

/// Calculate a purchase rate; takes and returns JSON
#[wasm_bindgen]
pub fn calculate_purchase_rate_total(inputs_json: &str) -> Result<String, JsValue> {
    purchase_rate_json(inputs_json).map_err(|e| JsValue::from_str(&e))
}

/// Calculate an offering price; takes and returns JSON
#[wasm_bindgen]
pub fn calculate_offering(inputs_json: &str) -> Result<String, JsValue> {
    offering_price_json(inputs_json).map_err(|e| JsValue::from_str(&e))
}

/// Check an action against the default role table. Unknown names are denied.
#[wasm_bindgen]
pub fn can_perform_action(role: &str, action: &str, resource: &str) -> bool {
    match (
        UserRole::from_str(role),
        Action::from_str(action),
        Resource::from_str(resource),
    ) {
        (Some(role), Some(action), Some(resource)) => {
            PermissionMatrix::mill_default().can_perform_action(role, action, resource)
        }
        _ => false,
    }
}

#[wasm_bindgen]
pub fn can_access_workflow_phase(role: &str, phase: &str) -> bool {
    match (UserRole::from_str(role), WorkflowPhase::from_str(phase)) {
        (Some(role), Some(phase)) => {
            PermissionMatrix::mill_default().can_access_workflow_phase(role, phase)
        }
        _ => false,
    }
}

#[wasm_bindgen]
pub fn can_create_user_role(creator: &str, target: &str) -> bool {
    match (UserRole::from_str(creator), UserRole::from_str(target)) {
        (Some(creator), Some(target)) => shared::can_create_user_role(creator, target),
        _ => false,
    }
}

/// Phase an entry moves to from `phase`; `decision` is read at LOT_SELECTION
#[wasm_bindgen]
pub fn workflow_successor(phase: &str, decision: Option<String>) -> Option<String> {
    next_phase(phase, decision)
}
