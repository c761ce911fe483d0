//! Sample entry offering: live pricing plus its finalized snapshot

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::rates::{calculate_offering_price, OfferingBreakdown, OfferingInputs, OfferingPrice};
use crate::types::StageStamp;

/// Who re-opened a finalized offering, when and why
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReopenAudit {
    pub by: Uuid,
    pub at: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleEntryOffering {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub inputs: OfferingInputs,
    /// Recomputed on every accepted change while not finalized
    pub live: OfferingPrice,
    pub is_finalized: bool,
    pub final_price: Option<Decimal>,
    pub final_breakdown: Option<OfferingBreakdown>,
    pub finalized: Option<StageStamp>,
    pub reopen_count: i32,
    pub last_reopen: Option<ReopenAudit>,
    pub created: StageStamp,
    pub updated: StageStamp,
}

impl SampleEntryOffering {
    pub fn new(entry_id: Uuid, inputs: OfferingInputs, stamp: StageStamp) -> DomainResult<Self> {
        let live = calculate_offering_price(&inputs)?;
        Ok(Self {
            id: Uuid::new_v4(),
            entry_id,
            inputs,
            live,
            is_finalized: false,
            final_price: None,
            final_breakdown: None,
            finalized: None,
            reopen_count: 0,
            last_reopen: None,
            created: stamp,
            updated: stamp,
        })
    }

    /// Replace the pricing configuration and recompute the live price
    pub fn apply(&mut self, inputs: OfferingInputs, stamp: StageStamp) -> DomainResult<()> {
        if self.is_finalized {
            return Err(DomainError::AlreadyFinalized(format!(
                "Offering {} is finalized; re-open it before changing the price",
                self.id
            )));
        }
        self.live = calculate_offering_price(&inputs)?;
        self.inputs = inputs;
        self.updated = stamp;
        Ok(())
    }

    /// Snapshot the live price into the final fields
    pub fn finalize(&mut self, stamp: StageStamp) -> DomainResult<Decimal> {
        if self.is_finalized {
            return Err(DomainError::AlreadyFinalized(format!(
                "Offering {} is already finalized",
                self.id
            )));
        }
        self.is_finalized = true;
        self.final_price = Some(self.live.final_price);
        self.final_breakdown = Some(self.live.breakdown.clone());
        self.finalized = Some(stamp);
        self.updated = stamp;
        Ok(self.live.final_price)
    }

    /// Explicitly unfreeze a finalized offering. The previous snapshot stays
    /// visible until the next finalize.
    pub fn reopen(&mut self, reason: &str, stamp: StageStamp) -> DomainResult<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation(
                "reopen_reason",
                "A reason is required to re-open an offering",
            ));
        }
        if !self.is_finalized {
            return Err(DomainError::InvariantViolation(format!(
                "Offering {} is not finalized",
                self.id
            )));
        }
        self.is_finalized = false;
        self.reopen_count += 1;
        self.last_reopen = Some(ReopenAudit {
            by: stamp.by,
            at: stamp.at,
            reason: reason.to_string(),
        });
        self.updated = stamp;
        Ok(())
    }

    /// The snapshot once finalized, the live value otherwise
    pub fn effective_price(&self) -> Decimal {
        match (self.is_finalized, self.final_price) {
            (true, Some(price)) => price,
            _ => self.live.final_price,
        }
    }
}
