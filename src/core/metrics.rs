use crate::domain::model::{ComplianceMetrics, ComplianceRecord, ComplianceStatus};

/// Rolls records up into totals. The average intensity is weighted by energy,
/// not a simple mean of the records' intensities.
pub fn compute_metrics(records: &[ComplianceRecord]) -> ComplianceMetrics {
    if records.is_empty() {
        return ComplianceMetrics::default();
    }

    let total_energy_consumed: f64 = records.iter().map(|r| r.energy_content).sum();
    let total_ghg_emissions: f64 = records
        .iter()
        .map(|r| r.energy_content * r.ghg_intensity)
        .sum();

    let average_ghg_intensity = if total_energy_consumed != 0.0 {
        total_ghg_emissions / total_energy_consumed
    } else {
        0.0
    };

    let compliant = records
        .iter()
        .filter(|r| r.compliance_status == ComplianceStatus::Compliant)
        .count();
    let compliance_rate = compliant as f64 / records.len() as f64 * 100.0;

    ComplianceMetrics {
        total_ghg_emissions,
        average_ghg_intensity,
        total_energy_consumed,
        compliance_rate,
    }
}
