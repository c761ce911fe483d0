//! Offering (final) price of a sample entry
//!
//! An additive model over a base rate. Every component is normalised to the
//! unit of the base rate through kilograms (1 kg, 100 kg per quintal, the
//! configured bag weight per bag). Party-borne charges come off the price the
//! party is offered; mill-borne charges are reported as mill cost only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{checked, round_money, QUINTAL_KG, STANDARD_BAG_KG};
use crate::error::{DomainError, DomainResult};

/// Unit a price or charge is quoted in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceUnit {
    PerBag,
    PerKg,
    #[default]
    PerQuintal,
}

impl PriceUnit {
    fn kilograms(&self, bag_weight_kg: Decimal) -> Decimal {
        match self {
            PriceUnit::PerBag => bag_weight_kg,
            PriceUnit::PerKg => Decimal::ONE,
            PriceUnit::PerQuintal => QUINTAL_KG,
        }
    }
}

/// Who pays a charge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Bearer {
    #[default]
    Party,
    Mill,
}

/// A toggleable price component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct OfferingComponent {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub unit: PriceUnit,
    #[serde(default)]
    pub bearer: Bearer,
}

impl OfferingComponent {
    pub fn enabled(value: Decimal, unit: PriceUnit, bearer: Bearer) -> Self {
        Self {
            enabled: true,
            value,
            unit,
            bearer,
        }
    }
}

fn default_bag_weight() -> Decimal {
    STANDARD_BAG_KG
}

/// Pricing configuration of a sample entry offering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferingInputs {
    pub base_rate: Decimal,
    #[serde(default)]
    pub base_unit: PriceUnit,
    #[serde(default = "default_bag_weight")]
    pub bag_weight_kg: Decimal,
    /// Weight deduction in kg per unit; the bearer is always the party
    #[serde(default)]
    pub sute: OfferingComponent,
    /// Quoted per kg or per quintal only
    #[serde(default)]
    pub hamali: OfferingComponent,
    #[serde(default)]
    pub brokerage: OfferingComponent,
    #[serde(default)]
    pub lf: OfferingComponent,
    #[serde(default)]
    pub egb: OfferingComponent,
    /// When present, the breakdown also carries a total amount
    #[serde(default)]
    pub quantity_bags: Option<i32>,
}

/// Every component expressed in the base unit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferingBreakdown {
    pub base_rate: Decimal,
    pub sute_deduction: Decimal,
    pub hamali: Decimal,
    pub brokerage: Decimal,
    pub lf: Decimal,
    pub egb: Decimal,
    pub party_deductions: Decimal,
    pub mill_costs: Decimal,
    pub total_amount: Option<Decimal>,
}

/// Result of an offering price calculation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OfferingPrice {
    pub final_price: Decimal,
    pub breakdown: OfferingBreakdown,
}

fn normalise(
    field: &str,
    component: &OfferingComponent,
    base_unit: PriceUnit,
    bag_weight: Decimal,
) -> DomainResult<Decimal> {
    if !component.enabled {
        return Ok(Decimal::ZERO);
    }
    let amount = component
        .value
        .checked_div(component.unit.kilograms(bag_weight))
        .and_then(|per_kg| per_kg.checked_mul(base_unit.kilograms(bag_weight)));
    checked(amount, field)
}

/// Calculate the price offered to the party for a sample entry
pub fn calculate_offering_price(inputs: &OfferingInputs) -> DomainResult<OfferingPrice> {
    if inputs.base_rate < Decimal::ZERO {
        return Err(DomainError::validation("base_rate", "Base rate cannot be negative"));
    }
    if inputs.bag_weight_kg <= Decimal::ZERO {
        return Err(DomainError::validation(
            "bag_weight_kg",
            "Bag weight must be positive",
        ));
    }
    if inputs.hamali.enabled && inputs.hamali.unit == PriceUnit::PerBag {
        return Err(DomainError::validation(
            "hamali.unit",
            "Hamali is quoted per kg or per quintal",
        ));
    }
    if let Some(bags) = inputs.quantity_bags {
        if bags < 0 {
            return Err(DomainError::validation("quantity_bags", "Bags cannot be negative"));
        }
    }

    let bag_weight = inputs.bag_weight_kg;
    let base_kg = inputs.base_unit.kilograms(bag_weight);

    let sute_deduction = if inputs.sute.enabled {
        checked(
            inputs
                .base_rate
                .checked_mul(inputs.sute.value)
                .and_then(|kg_value| kg_value.checked_div(inputs.sute.unit.kilograms(bag_weight))),
            "sute",
        )?
    } else {
        Decimal::ZERO
    };

    let charges = [
        (&inputs.hamali, normalise("hamali", &inputs.hamali, inputs.base_unit, bag_weight)?),
        (
            &inputs.brokerage,
            normalise("brokerage", &inputs.brokerage, inputs.base_unit, bag_weight)?,
        ),
        (&inputs.lf, normalise("lf", &inputs.lf, inputs.base_unit, bag_weight)?),
        (&inputs.egb, normalise("egb", &inputs.egb, inputs.base_unit, bag_weight)?),
    ];

    let mut party_deductions = sute_deduction;
    let mut mill_costs = Decimal::ZERO;
    for (component, amount) in &charges {
        match component.bearer {
            Bearer::Party => {
                party_deductions = checked(party_deductions.checked_add(*amount), "party_deductions")?
            }
            Bearer::Mill => mill_costs = checked(mill_costs.checked_add(*amount), "mill_costs")?,
        }
    }

    let final_price = round_money(checked(
        inputs.base_rate.checked_sub(party_deductions),
        "party_deductions",
    )?);
    let total_amount = match inputs.quantity_bags {
        Some(bags) => {
            let amount = final_price
                .checked_mul(Decimal::from(bags))
                .and_then(|value| value.checked_mul(bag_weight))
                .and_then(|value| value.checked_div(base_kg));
            Some(round_money(checked(amount, "quantity_bags")?))
        }
        None => None,
    };

    Ok(OfferingPrice {
        final_price,
        breakdown: OfferingBreakdown {
            base_rate: inputs.base_rate,
            sute_deduction: round_money(sute_deduction),
            hamali: round_money(charges[0].1),
            brokerage: round_money(charges[1].1),
            lf: round_money(charges[2].1),
            egb: round_money(charges[3].1),
            party_deductions: round_money(party_deductions),
            mill_costs: round_money(mill_costs),
            total_amount,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base() -> OfferingInputs {
        OfferingInputs {
            base_rate: dec!(2200),
            base_unit: PriceUnit::PerQuintal,
            bag_weight_kg: dec!(75),
            sute: OfferingComponent::default(),
            hamali: OfferingComponent::default(),
            brokerage: OfferingComponent::default(),
            lf: OfferingComponent::default(),
            egb: OfferingComponent::default(),
            quantity_bags: None,
        }
    }

    #[test]
    fn test_base_only() {
        let price = calculate_offering_price(&base()).unwrap();
        assert_eq!(price.final_price, dec!(2200));
        assert_eq!(price.breakdown.party_deductions, Decimal::ZERO);
    }

    #[test]
    fn test_disabled_components_ignored() {
        let mut inputs = base();
        inputs.hamali = OfferingComponent {
            enabled: false,
            value: dec!(999),
            unit: PriceUnit::PerQuintal,
            bearer: Bearer::Party,
        };
        inputs.sute.value = dec!(5);
        let price = calculate_offering_price(&inputs).unwrap();
        assert_eq!(price.final_price, dec!(2200));
        assert_eq!(price.breakdown.hamali, Decimal::ZERO);
    }

    #[test]
    fn test_party_hamali_per_kg_normalised_to_quintal() {
        let mut inputs = base();
        inputs.hamali = OfferingComponent::enabled(dec!(0.2), PriceUnit::PerKg, Bearer::Party);
        let price = calculate_offering_price(&inputs).unwrap();
        assert_eq!(price.breakdown.hamali, dec!(20));
        assert_eq!(price.final_price, dec!(2180));
    }

    #[test]
    fn test_mill_borne_charges_do_not_reduce_price() {
        let mut inputs = base();
        inputs.brokerage = OfferingComponent::enabled(dec!(10), PriceUnit::PerQuintal, Bearer::Mill);
        inputs.egb = OfferingComponent::enabled(dec!(3), PriceUnit::PerBag, Bearer::Mill);
        let price = calculate_offering_price(&inputs).unwrap();
        assert_eq!(price.final_price, dec!(2200));
        // 3 per 75 kg bag is 4 per quintal
        assert_eq!(price.breakdown.egb, dec!(4));
        assert_eq!(price.breakdown.mill_costs, dec!(14));
    }

    #[test]
    fn test_sute_per_bag_deduction() {
        let mut inputs = base();
        inputs.sute = OfferingComponent::enabled(dec!(1.5), PriceUnit::PerBag, Bearer::Party);
        let price = calculate_offering_price(&inputs).unwrap();
        // 1.5 kg of every 75 kg bag is 2%
        assert_eq!(price.breakdown.sute_deduction, dec!(44));
        assert_eq!(price.final_price, dec!(2156));
    }

    #[test]
    fn test_total_amount_for_quantity() {
        let mut inputs = base();
        inputs.quantity_bags = Some(100);
        let price = calculate_offering_price(&inputs).unwrap();
        // 100 bags of 75 kg is 75 quintals
        assert_eq!(price.breakdown.total_amount, Some(dec!(165000)));
    }

    #[test]
    fn test_hamali_per_bag_rejected() {
        let mut inputs = base();
        inputs.hamali = OfferingComponent::enabled(dec!(5), PriceUnit::PerBag, Bearer::Party);
        assert!(calculate_offering_price(&inputs).is_err());
    }

    #[test]
    fn test_per_bag_base_unit() {
        let mut inputs = base();
        inputs.base_rate = dec!(1650);
        inputs.base_unit = PriceUnit::PerBag;
        inputs.lf = OfferingComponent::enabled(dec!(2), PriceUnit::PerQuintal, Bearer::Party);
        let price = calculate_offering_price(&inputs).unwrap();
        assert_eq!(price.breakdown.lf, dec!(1.5));
        assert_eq!(price.final_price, dec!(1648.5));
    }
}
