use crate::core::balance::{status_for, Regulation};
use crate::core::metrics::compute_metrics;
use crate::domain::model::{
    BalanceResult, ComparisonResult, ComplianceCreateInput, ComplianceFilter, ComplianceMetrics,
    ComplianceRecord, ComplianceStatus, ComplianceUpdateInput,
};
use crate::domain::ports::ComplianceRepository;
use crate::utils::error::{LedgerError, Result};
use crate::utils::validation::{validate_finite, validate_non_empty_string, validate_non_negative};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Compliance records plus the calculations that read them.
pub struct ComplianceService {
    repository: Arc<dyn ComplianceRepository>,
    regulation: Regulation,
}

fn validate_measurements(
    fuel_consumption: Option<f64>,
    energy_content: Option<f64>,
    ghg_intensity: Option<f64>,
) -> Result<()> {
    if let Some(fuel) = fuel_consumption {
        validate_non_negative("fuel_consumption", fuel)?;
    }
    if let Some(energy) = energy_content {
        validate_non_negative("energy_content", energy)?;
    }
    if let Some(intensity) = ghg_intensity {
        validate_finite("ghg_intensity", intensity)?;
    }
    Ok(())
}

fn new_record(input: ComplianceCreateInput, now: DateTime<Utc>) -> Result<ComplianceRecord> {
    validate_non_empty_string("ship_id", &input.ship_id)?;
    validate_non_empty_string("route_id", &input.route_id)?;
    validate_non_empty_string("voyage_id", &input.voyage_id)?;
    validate_non_empty_string("reporting_period", &input.reporting_period)?;
    validate_measurements(
        Some(input.fuel_consumption),
        Some(input.energy_content),
        Some(input.ghg_intensity),
    )?;

    Ok(ComplianceRecord {
        id: Uuid::new_v4().to_string(),
        ship_id: input.ship_id.trim().to_string(),
        route_id: input.route_id.trim().to_string(),
        voyage_id: input.voyage_id.trim().to_string(),
        fuel_type: input.fuel_type,
        fuel_consumption: input.fuel_consumption,
        energy_content: input.energy_content,
        ghg_intensity: input.ghg_intensity,
        compliance_status: input.compliance_status.unwrap_or(ComplianceStatus::Pending),
        reporting_period: input.reporting_period.trim().to_string(),
        created_at: now,
        updated_at: now,
    })
}

impl ComplianceService {
    pub fn new(repository: Arc<dyn ComplianceRepository>, regulation: Regulation) -> Self {
        Self {
            repository,
            regulation,
        }
    }

    pub fn regulation(&self) -> &Regulation {
        &self.regulation
    }

    pub async fn create(&self, input: ComplianceCreateInput) -> Result<ComplianceRecord> {
        let record = new_record(input, Utc::now())?;
        let record = self.repository.insert_record(record).await?;
        tracing::debug!(
            "📝 Recorded compliance {} for ship {} ({})",
            record.id,
            record.ship_id,
            record.reporting_period
        );
        Ok(record)
    }

    /// Creates all inputs or none: every row is validated before anything is stored.
    pub async fn import(&self, inputs: Vec<ComplianceCreateInput>) -> Result<Vec<ComplianceRecord>> {
        let now = Utc::now();
        let records = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                new_record(input, now).inspect_err(|e| {
                    tracing::warn!("📥 Import rejected at row {}: {}", index + 1, e);
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let records = self.repository.insert_records(records).await?;
        tracing::info!("📥 Imported {} compliance records", records.len());
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> Result<ComplianceRecord> {
        self.repository
            .find_record(id)
            .await?
            .ok_or_else(|| LedgerError::not_found("ComplianceRecord", id))
    }

    pub async fn list(&self, filter: &ComplianceFilter) -> Result<Vec<ComplianceRecord>> {
        self.repository.list_records(filter).await
    }

    pub async fn update(&self, id: &str, input: ComplianceUpdateInput) -> Result<ComplianceRecord> {
        validate_measurements(input.fuel_consumption, input.energy_content, input.ghg_intensity)?;
        if let Some(period) = &input.reporting_period {
            validate_non_empty_string("reporting_period", period)?;
        }

        let mut record = self.get(id).await?;
        if let Some(fuel_type) = input.fuel_type {
            record.fuel_type = fuel_type;
        }
        if let Some(fuel) = input.fuel_consumption {
            record.fuel_consumption = fuel;
        }
        if let Some(energy) = input.energy_content {
            record.energy_content = energy;
        }
        if let Some(intensity) = input.ghg_intensity {
            record.ghg_intensity = intensity;
        }
        if let Some(status) = input.compliance_status {
            record.compliance_status = status;
        }
        if let Some(period) = input.reporting_period {
            record.reporting_period = period.trim().to_string();
        }
        record.updated_at = Utc::now();

        self.repository.update_record(record).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.repository.delete_record(id).await? {
            return Err(LedgerError::not_found("ComplianceRecord", id));
        }
        Ok(())
    }

    /// CB for a stored record, against its reporting period's target.
    pub async fn balance_for_record(&self, id: &str) -> Result<BalanceResult> {
        let record = self.get(id).await?;
        self.regulation.balance(
            record.ghg_intensity,
            record.fuel_consumption,
            &record.reporting_period,
        )
    }

    pub async fn comparison_for_record(&self, id: &str) -> Result<ComparisonResult> {
        let record = self.get(id).await?;
        self.regulation
            .comparison(record.ghg_intensity, &record.reporting_period)
    }

    /// Sets the record's status from its intensity versus the period target.
    pub async fn evaluate_record(&self, id: &str) -> Result<ComplianceRecord> {
        let comparison = self.comparison_for_record(id).await?;
        let status = status_for(&comparison);
        tracing::info!(
            "🔎 Record {} is {} (difference {:.4})",
            id,
            status,
            comparison.difference
        );
        self.update(
            id,
            ComplianceUpdateInput {
                compliance_status: Some(status),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn metrics(&self, filter: &ComplianceFilter) -> Result<ComplianceMetrics> {
        let records = self.repository.list_records(filter).await?;
        Ok(compute_metrics(&records))
    }

    pub async fn metrics_for_ship(
        &self,
        ship_id: &str,
        reporting_period: Option<&str>,
    ) -> Result<ComplianceMetrics> {
        self.metrics(&ComplianceFilter {
            ship_id: Some(ship_id.to_string()),
            reporting_period: reporting_period.map(str::to_string),
            ..Default::default()
        })
        .await
    }

    pub async fn metrics_for_route(
        &self,
        route_id: &str,
        reporting_period: Option<&str>,
    ) -> Result<ComplianceMetrics> {
        self.metrics(&ComplianceFilter {
            route_id: Some(route_id.to_string()),
            reporting_period: reporting_period.map(str::to_string),
            ..Default::default()
        })
        .await
    }

    pub async fn metrics_for_period(&self, reporting_period: &str) -> Result<ComplianceMetrics> {
        self.metrics(&ComplianceFilter {
            reporting_period: Some(reporting_period.to_string()),
            ..Default::default()
        })
        .await
    }
}
