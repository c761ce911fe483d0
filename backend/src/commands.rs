//! JSON command runner
//!
//! One JSON object per line in, one response per line out. Each command maps
//! onto a single engine operation; the caller supplies the actor resolved by
//! its own session layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{
    calculate_offering_price, calculate_purchase_rate, can_create_user_role, Action, Actor,
    CreateSampleEntryInput, OfferingInputs, PurchaseRateInputs, RecordInspectionInput, Resource,
    ReviewDecision, UserRole, WorkflowPhase,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult, ErrorDetail};
use crate::services::TransitionPayload;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    CreateEntry {
        actor: Actor,
        input: CreateSampleEntryInput,
    },
    GetEntry {
        actor: Actor,
        entry_id: Uuid,
    },
    Transition {
        actor: Actor,
        entry_id: Uuid,
        target: WorkflowPhase,
        #[serde(default)]
        payload: TransitionPayload,
    },
    Reject {
        actor: Actor,
        entry_id: Uuid,
        reason: String,
    },
    AllotLot {
        actor: Actor,
        entry_id: Uuid,
        supervisor_id: Uuid,
        #[serde(default)]
        allotted_bags: Option<i32>,
    },
    RecordInspection {
        actor: Actor,
        lot_id: Uuid,
        input: RecordInspectionInput,
    },
    CloseLot {
        actor: Actor,
        lot_id: Uuid,
        reason: String,
    },
    LotProgress {
        actor: Actor,
        lot_id: Uuid,
    },
    CalculatePurchaseRate {
        inputs: PurchaseRateInputs,
    },
    CalculateOfferingPrice {
        inputs: OfferingInputs,
    },
    CanPerformAction {
        role: UserRole,
        action: Action,
        resource: Resource,
    },
    CanAccessWorkflowPhase {
        role: UserRole,
        phase: WorkflowPhase,
    },
    CanCreateUserRole {
        creator: UserRole,
        target: UserRole,
    },
    SubmitPurchaseRate {
        actor: Actor,
        arrival_id: Uuid,
        inputs: PurchaseRateInputs,
    },
    ReviewPurchaseRate {
        actor: Actor,
        rate_id: Uuid,
        decision: ReviewDecision,
        #[serde(default)]
        remarks: Option<String>,
    },
}

/// One output line
#[derive(Debug, Serialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl Response {
    fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(error: &AppError) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.detail()),
        }
    }
}

fn to_json<T: Serialize>(value: T) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))
}

#[derive(Serialize)]
struct Allowed {
    allowed: bool,
}

/// Run one command against the engine
pub async fn execute(state: &AppState, command: Command) -> AppResult<Value> {
    match command {
        Command::CreateEntry { actor, input } => to_json(state.workflow.create_entry(actor, input).await?),
        Command::GetEntry { actor, entry_id } => to_json(state.workflow.get_entry(actor, entry_id).await?),
        Command::Transition {
            actor,
            entry_id,
            target,
            payload,
        } => to_json(state.workflow.transition(entry_id, actor, target, payload).await?),
        Command::Reject {
            actor,
            entry_id,
            reason,
        } => to_json(state.workflow.reject(entry_id, actor, &reason).await?),
        Command::AllotLot {
            actor,
            entry_id,
            supervisor_id,
            allotted_bags,
        } => to_json(
            state
                .lots
                .allot_lot(entry_id, actor, supervisor_id, allotted_bags)
                .await?,
        ),
        Command::RecordInspection { actor, lot_id, input } => {
            to_json(state.lots.record_inspection(lot_id, actor, input).await?)
        }
        Command::CloseLot { actor, lot_id, reason } => {
            to_json(state.lots.close_lot(lot_id, actor, &reason).await?)
        }
        Command::LotProgress { actor, lot_id } => to_json(state.lots.lot_progress(lot_id, actor).await?),
        Command::CalculatePurchaseRate { inputs } => to_json(calculate_purchase_rate(&inputs)?),
        Command::CalculateOfferingPrice { inputs } => to_json(calculate_offering_price(&inputs)?),
        Command::CanPerformAction {
            role,
            action,
            resource,
        } => to_json(Allowed {
            allowed: state.permissions.can_perform_action(role, action, resource),
        }),
        Command::CanAccessWorkflowPhase { role, phase } => to_json(Allowed {
            allowed: state.permissions.can_access_workflow_phase(role, phase),
        }),
        Command::CanCreateUserRole { creator, target } => to_json(Allowed {
            allowed: can_create_user_role(creator, target),
        }),
        Command::SubmitPurchaseRate {
            actor,
            arrival_id,
            inputs,
        } => to_json(
            state
                .purchase_rates
                .submit_purchase_rate(actor, arrival_id, inputs)
                .await?,
        ),
        Command::ReviewPurchaseRate {
            actor,
            rate_id,
            decision,
            remarks,
        } => to_json(
            state
                .purchase_rates
                .review_purchase_rate(actor, rate_id, decision, remarks)
                .await?,
        ),
    }
}

/// Parse and run one input line
pub async fn handle_line(state: &AppState, line: &str) -> Response {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(e) => {
            return Response::failure(&AppError::Validation {
                field: "command".to_string(),
                message: e.to_string(),
            })
        }
    };

    match execute(state, command).await {
        Ok(result) => Response::success(result),
        Err(err) => {
            match &err {
                AppError::PersistenceFailure(_) | AppError::Internal(_) | AppError::Configuration(_) => {
                    tracing::error!("Command failed: {:?}", err)
                }
                _ => tracing::debug!(code = err.code(), "Command refused: {}", err),
            }
            Response::failure(&err)
        }
    }
}
