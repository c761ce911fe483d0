//! Inventory and financial calculation models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::rates::{calculate_purchase_rate, PurchaseRateInputs, PurchaseRateResult, RateTerms};
use crate::types::StageStamp;

/// Weighment and storage of one inspected portion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryData {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub inspection_id: Uuid,
    pub gross_weight: Decimal,
    pub tare_weight: Decimal,
    pub net_weight: Decimal,
    pub location: String,
    pub variety: String,
    pub recorded: StageStamp,
}

/// Input for recording inventory against an inspection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryInput {
    pub inspection_id: Uuid,
    pub gross_weight: Decimal,
    #[serde(default)]
    pub tare_weight: Decimal,
    pub location: String,
    pub variety: String,
}

impl InventoryInput {
    pub fn net_weight(&self) -> DomainResult<Decimal> {
        self.gross_weight.checked_sub(self.tare_weight).ok_or_else(|| {
            DomainError::validation("gross_weight", "Weights are too large to calculate with")
        })
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.tare_weight < Decimal::ZERO {
            return Err(DomainError::validation("tare_weight", "Tare weight cannot be negative"));
        }
        if self.net_weight()? <= Decimal::ZERO {
            return Err(DomainError::validation(
                "gross_weight",
                "Gross weight must exceed tare weight",
            ));
        }
        if self.location.trim().is_empty() {
            return Err(DomainError::validation("location", "Storage location is required"));
        }
        if self.variety.trim().is_empty() {
            return Err(DomainError::validation("variety", "Variety is required"));
        }
        Ok(())
    }

    pub fn into_record(self, entry_id: Uuid, stamp: StageStamp) -> DomainResult<InventoryData> {
        let net_weight = self.net_weight()?;
        Ok(InventoryData {
            id: Uuid::new_v4(),
            entry_id,
            inspection_id: self.inspection_id,
            gross_weight: self.gross_weight,
            tare_weight: self.tare_weight,
            net_weight,
            location: self.location.trim().to_string(),
            variety: self.variety.trim().to_string(),
            recorded: stamp,
        })
    }
}

/// Monetary breakdown of one inventory record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialCalculation {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub inventory_id: Uuid,
    pub inputs: PurchaseRateInputs,
    pub result: PurchaseRateResult,
    pub calculated: StageStamp,
    pub recalculated: Option<StageStamp>,
    pub recalculation_count: i32,
}

impl FinancialCalculation {
    /// Price an inventory record with the bags of its inspection
    pub fn compute(
        inventory: &InventoryData,
        bags: i32,
        terms: RateTerms,
        stamp: StageStamp,
    ) -> DomainResult<Self> {
        let inputs = PurchaseRateInputs {
            bags,
            actual_net_weight: inventory.net_weight,
            terms,
        };
        let result = calculate_purchase_rate(&inputs)?;
        Ok(Self {
            id: Uuid::new_v4(),
            entry_id: inventory.entry_id,
            inventory_id: inventory.id,
            inputs,
            result,
            calculated: stamp,
            recalculated: None,
            recalculation_count: 0,
        })
    }

    /// Explicit recalculation with new terms; the only way a calculation changes
    pub fn recalculate(&mut self, terms: RateTerms, stamp: StageStamp) -> DomainResult<()> {
        let inputs = PurchaseRateInputs {
            bags: self.inputs.bags,
            actual_net_weight: self.inputs.actual_net_weight,
            terms,
        };
        self.result = calculate_purchase_rate(&inputs)?;
        self.inputs = inputs;
        self.recalculated = Some(stamp);
        self.recalculation_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::{RateMethod, RateType};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn stamp() -> StageStamp {
        StageStamp::new(Uuid::nil(), Utc::now())
    }

    fn terms(rate_type: RateType) -> RateTerms {
        RateTerms {
            rate_type,
            sute: Decimal::ZERO,
            sute_method: RateMethod::PerBag,
            base_rate: dec!(2000),
            base_rate_method: RateMethod::PerQuintal,
            h: Decimal::ZERO,
            h_method: RateMethod::PerBag,
            b: Decimal::ZERO,
            b_method: RateMethod::PerQuintal,
            lf: Decimal::ZERO,
            lf_method: RateMethod::PerBag,
            egb: Decimal::ZERO,
        }
    }

    fn input() -> InventoryInput {
        InventoryInput {
            inspection_id: Uuid::new_v4(),
            gross_weight: dec!(3800),
            tare_weight: dec!(50),
            location: "Godown 2".to_string(),
            variety: "BPT 5204".to_string(),
        }
    }

    #[test]
    fn test_inventory_net_weight() {
        let record = input().into_record(Uuid::nil(), stamp()).unwrap();
        assert_eq!(record.net_weight, dec!(3750));

        let mut huge = input();
        huge.gross_weight = Decimal::MIN;
        assert!(matches!(huge.validate(), Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_inventory_validation() {
        assert!(input().validate().is_ok());
        let mut bad = input();
        bad.tare_weight = dec!(4000);
        assert!(bad.validate().is_err());
        let mut bad = input();
        bad.location = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_compute_and_recalculate() {
        let record = input().into_record(Uuid::nil(), stamp()).unwrap();
        let mut calc = FinancialCalculation::compute(&record, 50, terms(RateType::Cdwb), stamp()).unwrap();
        assert_eq!(calc.result.total_amount, dec!(75000));
        assert_eq!(calc.recalculation_count, 0);

        let mut higher = terms(RateType::Cdwb);
        higher.base_rate = dec!(2100);
        calc.recalculate(higher, stamp()).unwrap();
        assert_eq!(calc.result.total_amount, dec!(78750));
        assert_eq!(calc.recalculation_count, 1);
        assert!(calc.recalculated.is_some());
        assert_eq!(calc.inputs.bags, 50);
    }
}
