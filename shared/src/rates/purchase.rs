//! Purchase rate calculation for an arrival
//!
//! Formula, with every weight in kg:
//! - sute weight is `sute * bags` per bag, or `net / 100 * sute` per quintal
//! - base amount is `(net - sute weight) / divisor * base rate`, where the
//!   divisor is 75 for a per-bag rate and 100 for a per-quintal rate
//! - H, B and LF amounts are `value * bags` per bag, or `net / 100 * value`
//!   per quintal, always on the actual net weight
//! - average rate is `total / net * 75`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{checked, round_money, QUINTAL_KG, STANDARD_BAG_KG};
use crate::error::{DomainError, DomainResult};

/// How a per-arrival value is applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RateMethod {
    PerBag,
    #[default]
    PerQuintal,
}

/// Rate type tag selecting the fee-inclusion rules
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RateType {
    #[serde(rename = "MDL")]
    Mdl,
    #[serde(rename = "MDWB")]
    Mdwb,
    #[serde(rename = "CDL")]
    Cdl,
    #[serde(rename = "CDWB")]
    Cdwb,
}

impl RateType {
    pub const ALL: [RateType; 4] = [RateType::Mdl, RateType::Mdwb, RateType::Cdl, RateType::Cdwb];

    /// MDL and MDWB read a negative H as "no hamali" and never carry LF
    pub fn is_md(&self) -> bool {
        matches!(self, RateType::Mdl | RateType::Mdwb)
    }

    /// EGB is only charged on the loose rate types
    pub fn charges_egb(&self) -> bool {
        matches!(self, RateType::Mdl | RateType::Cdl)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RateType::Mdl => "MDL",
            RateType::Mdwb => "MDWB",
            RateType::Cdl => "CDL",
            RateType::Cdwb => "CDWB",
        }
    }
}

impl std::fmt::Display for RateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate formula terms, independent of the weighed quantity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateTerms {
    pub rate_type: RateType,
    pub sute: Decimal,
    #[serde(default)]
    pub sute_method: RateMethod,
    pub base_rate: Decimal,
    #[serde(default)]
    pub base_rate_method: RateMethod,
    #[serde(default)]
    pub h: Decimal,
    #[serde(default)]
    pub h_method: RateMethod,
    #[serde(default)]
    pub b: Decimal,
    #[serde(default)]
    pub b_method: RateMethod,
    #[serde(default)]
    pub lf: Decimal,
    #[serde(default)]
    pub lf_method: RateMethod,
    /// Per-bag EGB value; zero when the arrival carries no EGB
    #[serde(default)]
    pub egb: Decimal,
}

/// Full input of a purchase rate calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRateInputs {
    pub bags: i32,
    pub actual_net_weight: Decimal,
    #[serde(flatten)]
    pub terms: RateTerms,
}

/// Line items behind a purchase rate total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRateBreakdown {
    pub sute_weight: Decimal,
    pub sute_net_weight: Decimal,
    pub base_amount: Decimal,
    /// H as computed, before the rate-type inclusion rule
    pub h_amount: Decimal,
    /// What H actually adds to the total
    pub h_contribution: Decimal,
    pub b_amount: Decimal,
    pub lf_amount: Decimal,
    pub egb_amount: Decimal,
}

/// Result of a purchase rate calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRateResult {
    pub total_amount: Decimal,
    pub average_rate: Decimal,
    pub breakdown: PurchaseRateBreakdown,
}

fn apply_method(
    field: &str,
    value: Decimal,
    method: RateMethod,
    bags: Decimal,
    net_weight: Decimal,
) -> DomainResult<Decimal> {
    let amount = match method {
        RateMethod::PerBag => value.checked_mul(bags),
        RateMethod::PerQuintal => net_weight
            .checked_div(QUINTAL_KG)
            .and_then(|quintals| quintals.checked_mul(value)),
    };
    checked(amount, field)
}

/// Calculate the purchase amount for an arrival
pub fn calculate_purchase_rate(inputs: &PurchaseRateInputs) -> DomainResult<PurchaseRateResult> {
    if inputs.bags < 0 {
        return Err(DomainError::validation("bags", "Bags cannot be negative"));
    }
    if inputs.actual_net_weight <= Decimal::ZERO {
        return Err(DomainError::validation(
            "actual_net_weight",
            "Actual net weight must be positive",
        ));
    }

    let terms = &inputs.terms;
    let bags = Decimal::from(inputs.bags);
    let net = inputs.actual_net_weight;

    let sute_weight = apply_method("sute", terms.sute, terms.sute_method, bags, net)?;
    let sute_net_weight = checked(net.checked_sub(sute_weight), "sute")?;

    let divisor = match terms.base_rate_method {
        RateMethod::PerBag => STANDARD_BAG_KG,
        RateMethod::PerQuintal => QUINTAL_KG,
    };
    let base_amount = checked(
        sute_net_weight
            .checked_div(divisor)
            .and_then(|units| units.checked_mul(terms.base_rate)),
        "base_rate",
    )?;

    let h_amount = apply_method("h", terms.h, terms.h_method, bags, net)?;
    let h_contribution = if terms.rate_type.is_md() && h_amount < Decimal::ZERO {
        Decimal::ZERO
    } else {
        h_amount
    };

    let b_amount = apply_method("b", terms.b, terms.b_method, bags, net)?;

    let lf_amount = if terms.rate_type.is_md() {
        Decimal::ZERO
    } else {
        apply_method("lf", terms.lf, terms.lf_method, bags, net)?
    };

    let egb_amount = if terms.rate_type.charges_egb() {
        checked(bags.checked_mul(terms.egb), "egb")?
    } else {
        Decimal::ZERO
    };

    let total = [h_contribution, b_amount, lf_amount, egb_amount]
        .into_iter()
        .try_fold(base_amount, |sum, amount| sum.checked_add(amount));
    let total = checked(total, "total_amount")?;
    let average_rate = checked(
        total
            .checked_div(net)
            .and_then(|per_kg| per_kg.checked_mul(STANDARD_BAG_KG)),
        "actual_net_weight",
    )?;

    Ok(PurchaseRateResult {
        total_amount: round_money(total),
        average_rate: round_money(average_rate),
        breakdown: PurchaseRateBreakdown {
            sute_weight: round_money(sute_weight),
            sute_net_weight: round_money(sute_net_weight),
            base_amount: round_money(base_amount),
            h_amount: round_money(h_amount),
            h_contribution: round_money(h_contribution),
            b_amount: round_money(b_amount),
            lf_amount: round_money(lf_amount),
            egb_amount: round_money(egb_amount),
        },
    })
}
