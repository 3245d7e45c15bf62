use crate::core::banking;
use crate::domain::model::{
    ApplyBankedResult, BankEntry, BankEntryFilter, BankSurplusRequest, BankSurplusResult,
};
use crate::domain::ports::BankRepository;
use crate::utils::error::{LedgerError, Result};
use crate::utils::locks::KeyedLocks;
use crate::utils::validation::validate_non_empty_string;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-ship banked units. Deposits and applications for the same ship run
/// one at a time so a partially consumed entry is never spent twice.
pub struct BankingLedger {
    repository: Arc<dyn BankRepository>,
    locks: KeyedLocks,
}

impl BankingLedger {
    pub fn new(repository: Arc<dyn BankRepository>) -> Self {
        Self {
            repository,
            locks: KeyedLocks::new(),
        }
    }

    async fn entries_for(&self, ship_id: &str) -> Result<Vec<BankEntry>> {
        self.repository
            .list_entries(&BankEntryFilter {
                ship_id: Some(ship_id.to_string()),
                ..Default::default()
            })
            .await
    }

    pub async fn bank_surplus(
        &self,
        ship_id: &str,
        request: BankSurplusRequest,
    ) -> Result<BankSurplusResult> {
        validate_non_empty_string("ship_id", ship_id)?;
        let _guard = self.locks.lock(ship_id).await;

        let existing = self.entries_for(ship_id).await?;
        let entry = match banking::bank_surplus(ship_id, &request, &existing) {
            Ok(entry) => entry,
            Err(e @ LedgerError::CapacityExceeded { .. }) => {
                tracing::warn!("🏦 Ship {}: {}", ship_id, e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let entry = self.repository.insert_entry(entry).await?;
        tracing::info!(
            "🏦 Ship {} banked {} units (entry {}, expires {})",
            ship_id,
            entry.units,
            entry.id,
            entry.expiry_date.date_naive()
        );
        Ok(BankSurplusResult::from(&entry))
    }

    /// Covers `deficit` from the ship's stored entries and persists what was
    /// consumed.
    pub async fn apply_banked(
        &self,
        ship_id: &str,
        deficit: f64,
        application_date: DateTime<Utc>,
    ) -> Result<ApplyBankedResult> {
        validate_non_empty_string("ship_id", ship_id)?;
        let _guard = self.locks.lock(ship_id).await;

        let entries = self.entries_for(ship_id).await?;
        let result = banking::apply_banked(deficit, application_date, &entries)?;

        if !result.entries_consumed.is_empty() {
            self.repository
                .consume_entries(&result.entries_consumed)
                .await?;
        }

        tracing::info!(
            "🏦 Ship {} applied {} banked units from {} entries, {} deficit left",
            ship_id,
            result.applied_units,
            result.entries_consumed.len(),
            result.remaining_deficit
        );
        Ok(result)
    }

    /// Same selection as [`Self::apply_banked`] over a caller-supplied candidate
    /// set. Nothing is persisted.
    pub fn apply_banked_from(
        &self,
        deficit: f64,
        application_date: DateTime<Utc>,
        available: &[BankEntry],
    ) -> Result<ApplyBankedResult> {
        banking::apply_banked(deficit, application_date, available)
    }

    pub async fn list_entries(&self, filter: &BankEntryFilter) -> Result<Vec<BankEntry>> {
        self.repository.list_entries(filter).await
    }

    pub async fn banked_balance(&self, ship_id: &str, at: DateTime<Utc>) -> Result<f64> {
        let entries = self.entries_for(ship_id).await?;
        Ok(banking::banked_balance(&entries, at))
    }
}
