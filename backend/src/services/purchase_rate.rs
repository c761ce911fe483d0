//! Purchase rate service: per-arrival rates and their approval

use std::sync::Arc;

use shared::{
    Action, Actor, ApprovalStatus, PermissionMatrix, PurchaseRate, PurchaseRateInputs, Resource,
    ReviewDecision, StageStamp,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::EntryStore;

#[derive(Clone)]
pub struct PurchaseRateService {
    store: Arc<dyn EntryStore>,
    permissions: Arc<PermissionMatrix>,
}

impl PurchaseRateService {
    pub fn new(store: Arc<dyn EntryStore>, permissions: Arc<PermissionMatrix>) -> Self {
        Self { store, permissions }
    }

    /// Submit the rate of an arrival, or resubmit one that is not approved
    #[tracing::instrument(skip(self, inputs), fields(role = %actor.role))]
    pub async fn submit_purchase_rate(
        &self,
        actor: Actor,
        arrival_id: Uuid,
        inputs: PurchaseRateInputs,
    ) -> AppResult<PurchaseRate> {
        if !self
            .permissions
            .can_perform_action(actor.role, Action::Create, Resource::PurchaseRate)
        {
            return Err(AppError::permission_denied(actor.role, "submit purchase rates"));
        }

        let stamp = StageStamp::now(&actor);
        let rate = match self.store.find_purchase_rate_by_arrival(arrival_id).await? {
            Some(mut rate) => {
                let expected = rate.version;
                rate.resubmit(inputs, stamp)?;
                self.store.save_purchase_rate(&rate, Some(expected)).await?;
                rate
            }
            None => {
                let rate = PurchaseRate::submit(arrival_id, inputs, stamp)?;
                self.store.save_purchase_rate(&rate, None).await?;
                rate
            }
        };

        tracing::info!(
            rate_id = %rate.id,
            total = %rate.result.total_amount,
            submissions = rate.submission_count,
            "Purchase rate submitted"
        );
        Ok(rate)
    }

    /// Approve or reject a pending rate
    #[tracing::instrument(skip(self, remarks), fields(role = %actor.role))]
    pub async fn review_purchase_rate(
        &self,
        actor: Actor,
        rate_id: Uuid,
        decision: ReviewDecision,
        remarks: Option<String>,
    ) -> AppResult<PurchaseRate> {
        if !self
            .permissions
            .can_perform_action(actor.role, Action::Approve, Resource::PurchaseRate)
        {
            return Err(AppError::permission_denied(actor.role, "review purchase rates"));
        }

        let mut rate = self
            .store
            .load_purchase_rate(rate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Purchase rate {}", rate_id)))?;
        if rate.status != ApprovalStatus::Pending {
            return Err(AppError::InvalidTransition {
                current: rate.status.to_string(),
                attempted: decision.status().to_string(),
            });
        }

        let expected = rate.version;
        rate.review(decision, remarks, StageStamp::now(&actor))?;
        self.store.save_purchase_rate(&rate, Some(expected)).await?;

        tracing::info!(status = %rate.status, "Purchase rate reviewed");
        Ok(rate)
    }

    pub async fn get_purchase_rate(&self, actor: Actor, rate_id: Uuid) -> AppResult<PurchaseRate> {
        if !self
            .permissions
            .can_perform_action(actor.role, Action::Read, Resource::PurchaseRate)
        {
            return Err(AppError::permission_denied(actor.role, "read purchase rates"));
        }
        self.store
            .load_purchase_rate(rate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Purchase rate {}", rate_id)))
    }
}
