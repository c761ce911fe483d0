//! Quality check and cooking report models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::types::StageStamp;
use crate::validation::{validate_moisture_content, validate_percentage};

/// Quality readings taken on a sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityParameters {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub readings: QualityReadings,
    pub recorded: StageStamp,
}

/// Laboratory readings, percentages unless noted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityReadings {
    pub moisture: Decimal,
    pub cutting1: Decimal,
    pub cutting2: Decimal,
    #[serde(default)]
    pub bend: Option<Decimal>,
    #[serde(default)]
    pub broken: Option<Decimal>,
    #[serde(default)]
    pub mix: Option<Decimal>,
    /// Sinkers/chalky kernels
    #[serde(default)]
    pub sk: Option<Decimal>,
    #[serde(default)]
    pub lustre: Option<String>,
    /// Weight of 100 grains in grams
    #[serde(default)]
    pub grams_per_100_grains: Option<Decimal>,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl QualityReadings {
    pub fn validate(&self) -> DomainResult<()> {
        validate_moisture_content(self.moisture)
            .map_err(|m| DomainError::validation("moisture", m))?;
        for (field, value) in [
            ("cutting1", Some(self.cutting1)),
            ("cutting2", Some(self.cutting2)),
            ("bend", self.bend),
            ("broken", self.broken),
            ("mix", self.mix),
            ("sk", self.sk),
        ] {
            if let Some(value) = value {
                validate_percentage(value).map_err(|m| DomainError::validation(field, m))?;
            }
        }
        if let Some(grams) = self.grams_per_100_grains {
            if grams <= Decimal::ZERO {
                return Err(DomainError::validation(
                    "grams_per_100_grains",
                    "Grain weight must be positive",
                ));
            }
        }
        Ok(())
    }
}

/// Result of the cooking test
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CookingStatus {
    Pass,
    Fail,
    Recheck,
}

impl std::fmt::Display for CookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CookingStatus::Pass => write!(f, "PASS"),
            CookingStatus::Fail => write!(f, "FAIL"),
            CookingStatus::Recheck => write!(f, "RECHECK"),
        }
    }
}

/// Cooking test report of a sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CookingReport {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub status: CookingStatus,
    pub remarks: Option<String>,
    pub recorded: StageStamp,
}

/// Input for a cooking report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CookingReportInput {
    pub status: CookingStatus,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn readings() -> QualityReadings {
        QualityReadings {
            moisture: dec!(14.5),
            cutting1: dec!(2),
            cutting2: dec!(1.5),
            bend: Some(dec!(3)),
            broken: None,
            mix: None,
            sk: None,
            lustre: Some("good".to_string()),
            grams_per_100_grains: Some(dec!(2.1)),
            remarks: None,
        }
    }

    #[test]
    fn test_valid_readings() {
        assert!(readings().validate().is_ok());
    }

    #[test]
    fn test_moisture_out_of_range() {
        let mut r = readings();
        r.moisture = dec!(120);
        assert_eq!(
            r.validate().unwrap_err(),
            DomainError::validation("moisture", "Moisture content must be between 0 and 100%")
        );
    }

    #[test]
    fn test_negative_cutting_rejected() {
        let mut r = readings();
        r.cutting2 = dec!(-1);
        assert!(matches!(
            r.validate(),
            Err(DomainError::Validation { field, .. }) if field == "cutting2"
        ));
    }

    #[test]
    fn test_cooking_status_serde() {
        let input: CookingReportInput = serde_json::from_str(r#"{"status":"RECHECK"}"#).unwrap();
        assert_eq!(input.status, CookingStatus::Recheck);
        assert!(input.remarks.is_none());
    }
}
