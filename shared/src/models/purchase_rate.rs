//! Purchase rate of an arrival and its approval sub-workflow

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::rates::{calculate_purchase_rate, PurchaseRateInputs, PurchaseRateResult};
use crate::types::StageStamp;

/// Approval status of a purchase rate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "PENDING",
            ApprovalStatus::Approved => "APPROVED",
            ApprovalStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome chosen by the reviewer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn status(&self) -> ApprovalStatus {
        match self {
            ReviewDecision::Approve => ApprovalStatus::Approved,
            ReviewDecision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Rate formula inputs and totals for one arrival
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRate {
    pub id: Uuid,
    pub arrival_id: Uuid,
    pub inputs: PurchaseRateInputs,
    pub result: PurchaseRateResult,
    pub status: ApprovalStatus,
    pub submitted: StageStamp,
    pub submission_count: i32,
    pub reviewed: Option<StageStamp>,
    pub review_remarks: Option<String>,
    pub version: i64,
}

impl PurchaseRate {
    pub fn submit(arrival_id: Uuid, inputs: PurchaseRateInputs, stamp: StageStamp) -> DomainResult<Self> {
        let result = calculate_purchase_rate(&inputs)?;
        Ok(Self {
            id: Uuid::new_v4(),
            arrival_id,
            inputs,
            result,
            status: ApprovalStatus::Pending,
            submitted: stamp,
            submission_count: 1,
            reviewed: None,
            review_remarks: None,
            version: 0,
        })
    }

    /// Recompute with new inputs and return to pending. Approved rates are frozen.
    pub fn resubmit(&mut self, inputs: PurchaseRateInputs, stamp: StageStamp) -> DomainResult<()> {
        if self.status == ApprovalStatus::Approved {
            return Err(DomainError::AlreadyFinalized(format!(
                "Purchase rate {} is approved and cannot be changed",
                self.id
            )));
        }
        self.result = calculate_purchase_rate(&inputs)?;
        self.inputs = inputs;
        self.status = ApprovalStatus::Pending;
        self.submitted = stamp;
        self.submission_count += 1;
        self.reviewed = None;
        self.review_remarks = None;
        self.version += 1;
        Ok(())
    }

    /// Settle a pending rate. Rejection needs remarks for the submitter.
    pub fn review(
        &mut self,
        decision: ReviewDecision,
        remarks: Option<String>,
        stamp: StageStamp,
    ) -> DomainResult<()> {
        if self.status != ApprovalStatus::Pending {
            return Err(DomainError::InvariantViolation(format!(
                "Purchase rate {} is {} and cannot be reviewed",
                self.id, self.status
            )));
        }
        let remarks = remarks
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if decision == ReviewDecision::Reject && remarks.is_none() {
            return Err(DomainError::validation(
                "remarks",
                "Remarks are required when rejecting a purchase rate",
            ));
        }
        self.status = decision.status();
        self.reviewed = Some(stamp);
        self.review_remarks = remarks;
        self.version += 1;
        Ok(())
    }

    pub fn total_amount(&self) -> Decimal {
        self.result.total_amount
    }
}
