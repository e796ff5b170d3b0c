use std::path::Path;

use rust_decimal::RoundingStrategy;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};

/// midpoint rule used when an income amount is rounded to a whole number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IncomeRounding {
    /// 16.5 becomes 17
    #[default]
    HalfAwayFromZero,
    /// 16.5 becomes 16, 17.5 becomes 18
    HalfEven,
}

impl IncomeRounding {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            IncomeRounding::HalfAwayFromZero => RoundingStrategy::MidpointAwayFromZero,
            IncomeRounding::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

/// what happens when the next month has no such day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MonthOverflow {
    /// surplus days spill into the following month (Jan 31 -> Mar 2 in a leap year)
    #[default]
    Roll,
    /// stop at the last day of the month (Jan 31 -> Feb 29)
    Clamp,
}

/// schedule engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// ratio used by investments that carry none of their own
    pub default_income_ratio: Rate,
    pub rounding: IncomeRounding,
    pub month_overflow: MonthOverflow,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_income_ratio: Rate::from_decimal(dec!(0.05)),
            rounding: IncomeRounding::default(),
            month_overflow: MonthOverflow::default(),
        }
    }
}

impl ScheduleConfig {
    /// default configuration with month-end clamping
    pub fn clamped() -> Self {
        Self {
            month_overflow: MonthOverflow::Clamp,
            ..Self::default()
        }
    }

    /// default configuration with another fallback ratio
    pub fn with_default_ratio(ratio: Rate) -> Self {
        Self {
            default_income_ratio: ratio,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_income_ratio.is_negative() {
            return Err(LedgerError::InvalidConfiguration {
                message: format!(
                    "default income ratio must not be negative: {}",
                    self.default_income_ratio
                ),
            });
        }
        Ok(())
    }

    /// load from json, missing keys keep their defaults
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: ScheduleConfig = serde_json::from_str(text).map_err(|e| {
            LedgerError::InvalidConfiguration {
                message: e.to_string(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LedgerError::InvalidConfiguration {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScheduleConfig::default();
        assert_eq!(config.default_income_ratio, Rate::from_percentage(5));
        assert_eq!(config.rounding, IncomeRounding::HalfAwayFromZero);
        assert_eq!(config.month_overflow, MonthOverflow::Roll);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ScheduleConfig::from_json_str(r#"{"month_overflow": "Clamp"}"#).unwrap();
        assert_eq!(config.month_overflow, MonthOverflow::Clamp);
        assert_eq!(config.default_income_ratio, Rate::from_percentage(5));

        let config = ScheduleConfig::from_json_str(r#"{"default_income_ratio": "0.07", "rounding": "HalfEven"}"#).unwrap();
        assert_eq!(config.default_income_ratio, Rate::from_percentage(7));
        assert_eq!(config.rounding, IncomeRounding::HalfEven);
    }

    #[test]
    fn test_negative_default_ratio_rejected() {
        let result = ScheduleConfig::from_json_str(r#"{"default_income_ratio": "-0.01"}"#);
        assert!(matches!(result, Err(LedgerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_from_missing_file() {
        let result = ScheduleConfig::from_json_file("/nonexistent/ledger-config.json");
        assert!(matches!(result, Err(LedgerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.json");
        std::fs::write(&path, r#"{"month_overflow": "Clamp"}"#).unwrap();

        assert_eq!(ScheduleConfig::from_json_file(&path).unwrap(), ScheduleConfig::clamped());
    }
}
