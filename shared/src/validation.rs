//! Validation utilities for mill sample readings and workflow inputs

use rust_decimal::Decimal;

// ============================================================================
// Quality Reading Validations
// ============================================================================

/// Validate moisture content is a percentage
pub fn validate_moisture_content(moisture: Decimal) -> Result<(), &'static str> {
    if moisture < Decimal::ZERO || moisture > Decimal::ONE_HUNDRED {
        return Err("Moisture content must be between 0 and 100%");
    }
    Ok(())
}

/// Validate a percentage reading (cutting, bend, broken, mix)
pub fn validate_percentage(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Percentage cannot be negative");
    }
    if value > Decimal::ONE_HUNDRED {
        return Err("Percentage cannot exceed 100");
    }
    Ok(())
}

// ============================================================================
// Workflow Input Validations
// ============================================================================

/// Validate a free-text reason (rejection, lot close, re-open)
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err("Reason is required");
    }
    if trimmed.chars().count() > 500 {
        return Err("Reason must be at most 500 characters");
    }
    Ok(())
}

/// Validate a bag count
pub fn validate_bags(bags: i32) -> Result<(), &'static str> {
    if bags <= 0 {
        return Err("Bags must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moisture_content_validation() {
        assert!(validate_moisture_content(Decimal::from(14)).is_ok());
        assert!(validate_moisture_content(Decimal::from(0)).is_ok());
        assert!(validate_moisture_content(Decimal::from(100)).is_ok());
        assert!(validate_moisture_content(Decimal::from(-1)).is_err());
        assert!(validate_moisture_content(Decimal::from(101)).is_err());
    }

    #[test]
    fn test_percentage_validation() {
        assert!(validate_percentage(Decimal::from(0)).is_ok());
        assert!(validate_percentage(Decimal::new(255, 1)).is_ok());
        assert_eq!(
            validate_percentage(Decimal::from(-2)),
            Err("Percentage cannot be negative")
        );
        assert!(validate_percentage(Decimal::from(101)).is_err());
    }

    #[test]
    fn test_reason_validation() {
        assert!(validate_reason("party delivered 80 of 100 bags").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_bags_validation() {
        assert!(validate_bags(1).is_ok());
        assert!(validate_bags(0).is_err());
        assert!(validate_bags(-5).is_err());
    }
}
