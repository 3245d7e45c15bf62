//! Compliance balance and target comparison.
//!
//! `cb = (target - actual) * fuel_consumption * energy_conversion_factor`.
//! A non-negative balance is a surplus, a negative one a deficit.

use crate::domain::model::{BalanceResult, ComparisonResult, ComplianceStatus};
use crate::utils::error::Result;
use crate::utils::validation::{validate_finite, validate_non_negative};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// gCO2eq/MJ.
pub const DEFAULT_TARGET_GHG_INTENSITY: f64 = 89.3368;
/// MJ per tonne of fuel.
pub const DEFAULT_ENERGY_CONVERSION_FACTOR: f64 = 41_000.0;

pub fn compute_balance(
    actual_ghg_intensity: f64,
    fuel_consumption: f64,
    target_ghg_intensity: f64,
    energy_conversion_factor: f64,
) -> Result<BalanceResult> {
    validate_finite("actual_ghg_intensity", actual_ghg_intensity)?;
    validate_non_negative("fuel_consumption", fuel_consumption)?;
    validate_finite("target_ghg_intensity", target_ghg_intensity)?;
    validate_finite("energy_conversion_factor", energy_conversion_factor)?;

    let cb = (target_ghg_intensity - actual_ghg_intensity)
        * fuel_consumption
        * energy_conversion_factor;

    Ok(BalanceResult {
        cb,
        actual: actual_ghg_intensity,
        target: target_ghg_intensity,
        fuel_consumption,
        is_surplus: cb >= 0.0,
    })
}

pub fn compute_comparison(
    actual_ghg_intensity: f64,
    target_ghg_intensity: f64,
) -> Result<ComparisonResult> {
    validate_finite("actual_ghg_intensity", actual_ghg_intensity)?;
    validate_finite("target_ghg_intensity", target_ghg_intensity)?;

    let difference = actual_ghg_intensity - target_ghg_intensity;
    Ok(ComparisonResult {
        actual: actual_ghg_intensity,
        target: target_ghg_intensity,
        difference,
        is_compliant: difference <= 0.0,
    })
}

pub fn status_for(comparison: &ComparisonResult) -> ComplianceStatus {
    if comparison.is_compliant {
        ComplianceStatus::Compliant
    } else {
        ComplianceStatus::NonCompliant
    }
}

/// Regulatory constants, with optional per-reporting-period targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Regulation {
    pub default_target_ghg_intensity: f64,
    pub energy_conversion_factor: f64,
    #[serde(default)]
    pub targets: HashMap<String, f64>,
}

impl Default for Regulation {
    fn default() -> Self {
        Self {
            default_target_ghg_intensity: DEFAULT_TARGET_GHG_INTENSITY,
            energy_conversion_factor: DEFAULT_ENERGY_CONVERSION_FACTOR,
            targets: HashMap::new(),
        }
    }
}

impl Regulation {
    pub fn target_for(&self, reporting_period: &str) -> f64 {
        self.targets
            .get(reporting_period)
            .copied()
            .unwrap_or(self.default_target_ghg_intensity)
    }

    pub fn balance(
        &self,
        actual_ghg_intensity: f64,
        fuel_consumption: f64,
        reporting_period: &str,
    ) -> Result<BalanceResult> {
        compute_balance(
            actual_ghg_intensity,
            fuel_consumption,
            self.target_for(reporting_period),
            self.energy_conversion_factor,
        )
    }

    pub fn comparison(
        &self,
        actual_ghg_intensity: f64,
        reporting_period: &str,
    ) -> Result<ComparisonResult> {
        compute_comparison(actual_ghg_intensity, self.target_for(reporting_period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::LedgerError;

    #[test]
    fn test_surplus_when_below_target() {
        let result = compute_balance(88.0, 100.0, 89.3368, 41_000.0).unwrap();
        let expected = (89.3368 - 88.0) * 100.0 * 41_000.0;
        assert!((result.cb - expected).abs() < 1e-6);
        assert!(result.is_surplus);
        assert_eq!(result.actual, 88.0);
        assert_eq!(result.target, 89.3368);
        assert_eq!(result.fuel_consumption, 100.0);
    }

    #[test]
    fn test_deficit_when_above_target() {
        let result = compute_balance(93.5, 5100.0, 89.3368, 41_000.0).unwrap();
        assert!(result.cb < 0.0);
        assert!(!result.is_surplus);
    }

    #[test]
    fn test_zero_fuel_is_surplus() {
        let result = compute_balance(120.0, 0.0, 89.3368, 41_000.0).unwrap();
        assert_eq!(result.cb, 0.0);
        assert!(result.is_surplus);
    }

    #[test]
    fn test_cb_is_linear_in_fuel() {
        for actual in [80.0, 89.3368, 95.25] {
            let one = compute_balance(actual, 1.0, 89.3368, 41_000.0).unwrap();
            for fuel in [0.0, 2.5, 10.0, 4_900.0] {
                let scaled = compute_balance(actual, fuel, 89.3368, 41_000.0).unwrap();
                assert!((scaled.cb - one.cb * fuel).abs() < 1e-6 * (1.0 + scaled.cb.abs()));
                assert_eq!(scaled.is_surplus, scaled.cb >= 0.0);
            }
        }
    }

    #[test]
    fn test_rejects_non_finite_and_negative_fuel() {
        assert!(matches!(
            compute_balance(f64::NAN, 1.0, 89.0, 41_000.0),
            Err(LedgerError::Validation { .. })
        ));
        assert!(compute_balance(89.0, f64::INFINITY, 89.0, 41_000.0).is_err());
        assert!(compute_balance(89.0, -1.0, 89.0, 41_000.0).is_err());
        assert!(compute_balance(89.0, 1.0, 89.0, f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn test_comparison() {
        let same = compute_comparison(91.0, 91.0).unwrap();
        assert_eq!(same.difference, 0.0);
        assert!(same.is_compliant);

        let above = compute_comparison(93.5, 89.3368).unwrap();
        assert!(above.difference > 0.0);
        assert!(!above.is_compliant);
        assert_eq!(status_for(&above), ComplianceStatus::NonCompliant);

        assert!(compute_comparison(f64::NAN, 89.0).is_err());
    }

    #[test]
    fn test_regulation_period_override() {
        let mut regulation = Regulation::default();
        regulation.targets.insert("2030".to_string(), 80.0);

        assert_eq!(regulation.target_for("2025"), DEFAULT_TARGET_GHG_INTENSITY);
        assert_eq!(regulation.target_for("2030"), 80.0);
        assert!(!regulation.comparison(85.0, "2030").unwrap().is_compliant);
        assert!(regulation.comparison(85.0, "2025").unwrap().is_compliant);
    }
}
