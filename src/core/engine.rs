use crate::adapters::memory::MemoryStore;
use crate::adapters::snapshot::SnapshotFile;
use crate::adapters::storage::LocalStorage;
use crate::app::services::{BankingLedger, ComplianceService, PoolAllocator};
use crate::domain::model::{ApplyBankedResult, BankSurplusRequest, BankSurplusResult};
use crate::domain::ports::{ConfigProvider, Storage};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Banking defaults applied when a caller does not supply its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BankingDefaults {
    pub validity_years: u32,
    pub max_capacity: Option<f64>,
}

/// Owns the store and the three services for one process. Opened once at
/// start-up, closed once at shutdown; there is no global instance.
pub struct LedgerEngine<S: Storage = LocalStorage> {
    store: Arc<MemoryStore>,
    snapshot: Option<SnapshotFile<S>>,
    compliance: ComplianceService,
    banking: BankingLedger,
    pools: PoolAllocator,
    banking_defaults: BankingDefaults,
}

impl LedgerEngine<LocalStorage> {
    /// Engine with nothing persisted; `close` is a no-op.
    pub fn in_memory<C: ConfigProvider>(config: &C) -> Self {
        Self::assemble(Arc::new(MemoryStore::new()), None, config)
    }
}

impl<S: Storage> LedgerEngine<S> {
    fn assemble<C: ConfigProvider>(
        store: Arc<MemoryStore>,
        snapshot: Option<SnapshotFile<S>>,
        config: &C,
    ) -> Self {
        Self {
            compliance: ComplianceService::new(store.clone(), config.regulation()),
            banking: BankingLedger::new(store.clone()),
            pools: PoolAllocator::new(store.clone()),
            banking_defaults: BankingDefaults {
                validity_years: config.banking_validity_years(),
                max_capacity: config.max_banking_capacity(),
            },
            store,
            snapshot,
        }
    }

    /// Loads the ledger snapshot from `storage`, or starts empty if there is none.
    pub async fn open<C: ConfigProvider>(config: &C, storage: S) -> Result<Self> {
        let snapshot = SnapshotFile::new(storage, config.snapshot_file());
        let store = snapshot.load().await?;
        tracing::info!("📒 Ledger opened from {}", snapshot.file_name());
        Ok(Self::assemble(Arc::new(store), Some(snapshot), config))
    }

    /// Writes the current state back without closing.
    pub async fn flush(&self) -> Result<()> {
        match &self.snapshot {
            Some(snapshot) => snapshot.save(&self.store).await,
            None => Ok(()),
        }
    }

    pub async fn close(self) -> Result<()> {
        self.flush().await?;
        tracing::info!("📒 Ledger closed");
        Ok(())
    }

    pub fn compliance(&self) -> &ComplianceService {
        &self.compliance
    }

    pub fn banking(&self) -> &BankingLedger {
        &self.banking
    }

    pub fn pools(&self) -> &PoolAllocator {
        &self.pools
    }

    pub fn banking_defaults(&self) -> BankingDefaults {
        self.banking_defaults
    }

    /// Banks `units` for `ship_id`, filling validity and capacity from the
    /// configured defaults where not given.
    pub async fn bank_surplus(
        &self,
        ship_id: &str,
        units: f64,
        banking_date: DateTime<Utc>,
        max_capacity: Option<f64>,
        validity_years: Option<u32>,
    ) -> Result<BankSurplusResult> {
        let request = BankSurplusRequest {
            surplus_units: units,
            banking_date,
            max_banking_capacity: max_capacity.or(self.banking_defaults.max_capacity),
            banking_validity_years: validity_years.unwrap_or(self.banking_defaults.validity_years),
        };
        self.banking.bank_surplus(ship_id, request).await
    }

    pub async fn apply_banked(
        &self,
        ship_id: &str,
        deficit: f64,
        application_date: DateTime<Utc>,
    ) -> Result<ApplyBankedResult> {
        self.banking
            .apply_banked(ship_id, deficit, application_date)
            .await
    }
}
