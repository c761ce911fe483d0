//! Rate calculation engine
//!
//! Pure, deterministic pricing functions. Nothing here keeps state between
//! calls, so every function is safe to call from any thread.

pub mod offering;
pub mod purchase;

pub use offering::*;
pub use purchase::*;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{DomainError, DomainResult};

/// Kilograms in one quintal
pub const QUINTAL_KG: Decimal = Decimal::ONE_HUNDRED;

/// Standard paddy bag weight, also the basis of the average rate
pub const STANDARD_BAG_KG: Decimal = Decimal::from_parts(75, 0, 0, false, 0);

/// Round a monetary amount to paise
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Result of a checked Decimal operation, with overflow reported against
/// the input `field` that drove it
pub(crate) fn checked(value: Option<Decimal>, field: &str) -> DomainResult<Decimal> {
    value.ok_or_else(|| DomainError::validation(field, "Value is too large to calculate with"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_constants() {
        assert_eq!(STANDARD_BAG_KG, dec!(75));
        assert_eq!(QUINTAL_KG, dec!(100));
    }

    #[test]
    fn test_checked_overflow_names_field() {
        assert_eq!(checked(dec!(2).checked_mul(dec!(3)), "egb").unwrap(), dec!(6));
        assert!(matches!(
            checked(Decimal::MAX.checked_mul(dec!(2)), "egb"),
            Err(DomainError::Validation { field, .. }) if field == "egb"
        ));
    }

    #[test]
    fn test_round_money_midpoint() {
        assert_eq!(round_money(dec!(10.005)), dec!(10.01));
        assert_eq!(round_money(dec!(-10.005)), dec!(-10.01));
        assert_eq!(round_money(dec!(3.3333)), dec!(3.33));
    }
}
