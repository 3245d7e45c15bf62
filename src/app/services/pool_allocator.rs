use crate::core::pooling;
use crate::domain::model::{
    Pool, PoolAudit, PoolCreateInput, PoolMember, PoolStatus, PoolUpdateInput,
};
use crate::domain::ports::PoolRepository;
use crate::utils::error::{LedgerError, Result};
use crate::utils::locks::KeyedLocks;
use crate::utils::validation::validate_non_empty_string;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Pool lifecycle and member allocations.
///
/// Every change to a pool's members holds that pool's lock across the
/// read, the conservation check and the write, so two concurrent allocations
/// can never both pass against the same stale counter.
pub struct PoolAllocator {
    repository: Arc<dyn PoolRepository>,
    locks: KeyedLocks,
}

fn log_rejection(pool_id: &str, err: &LedgerError) {
    if let LedgerError::ConservationViolation { .. } = err {
        tracing::warn!("🚫 Pool {}: {}", pool_id, err);
    }
}

impl PoolAllocator {
    pub fn new(repository: Arc<dyn PoolRepository>) -> Self {
        Self {
            repository,
            locks: KeyedLocks::new(),
        }
    }

    pub async fn create_pool(&self, input: PoolCreateInput) -> Result<Pool> {
        let pool = pooling::create_pool(Uuid::new_v4().to_string(), &input, Utc::now())?;
        let pool = self.repository.insert_pool(pool).await?;
        tracing::info!("🏊 Created {} pool '{}' ({})", pool.pool_type, pool.name, pool.id);
        Ok(pool)
    }

    pub async fn get_pool(&self, pool_id: &str) -> Result<Pool> {
        self.repository
            .find_pool(pool_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Pool", pool_id))
    }

    pub async fn list_pools(&self, status: Option<PoolStatus>) -> Result<Vec<Pool>> {
        self.repository.list_pools(status).await
    }

    pub async fn list_active_pools(&self) -> Result<Vec<Pool>> {
        self.repository.list_pools(Some(PoolStatus::Active)).await
    }

    pub async fn list_pools_for_ship(&self, ship_id: &str) -> Result<Vec<Pool>> {
        self.repository.list_pools_for_ship(ship_id).await
    }

    pub async fn update_pool(&self, pool_id: &str, input: PoolUpdateInput) -> Result<Pool> {
        let _guard = self.locks.lock(pool_id).await;

        let pool = self.get_pool(pool_id).await?;
        let updated = pooling::apply_update(&pool, &input, Utc::now()).inspect_err(|e| {
            log_rejection(pool_id, e);
        })?;

        let members = if updated.total_compliance_units != pool.total_compliance_units {
            let members = self.repository.list_members(pool_id).await?;
            pooling::rescale_members(&updated, &members)
        } else {
            Vec::new()
        };

        let updated = self.repository.update_pool(updated, members).await?;
        if updated.status != pool.status {
            tracing::info!("🏊 Pool {} moved {} -> {}", pool_id, pool.status, updated.status);
        }
        Ok(updated)
    }

    /// Removes the pool together with all of its members.
    pub async fn delete_pool(&self, pool_id: &str) -> Result<()> {
        let _guard = self.locks.lock(pool_id).await;
        let removed = self.repository.delete_pool(pool_id).await?;
        tracing::info!("🏊 Deleted pool {} and {} members", pool_id, removed);
        Ok(())
    }

    pub async fn add_member(&self, pool_id: &str, ship_id: &str, units: f64) -> Result<PoolMember> {
        let _guard = self.locks.lock(pool_id).await;
        self.add_member_locked(pool_id, ship_id, units).await
    }

    // caller holds the pool lock
    async fn add_member_locked(
        &self,
        pool_id: &str,
        ship_id: &str,
        units: f64,
    ) -> Result<PoolMember> {
        validate_non_empty_string("ship_id", ship_id)?;
        let pool = self.get_pool(pool_id).await?;
        pooling::ensure_open(&pool)?;

        if self.repository.find_member(pool_id, ship_id).await?.is_some() {
            return Err(LedgerError::validation(
                "ship_id",
                ship_id,
                format!("Ship is already a member of pool {}", pool_id),
            ));
        }
        pooling::check_allocation(&pool, units).inspect_err(|e| log_rejection(pool_id, e))?;

        let member = pooling::new_member(&pool, ship_id, units, Utc::now());
        let pool = self.repository.upsert_member(member.clone(), units).await?;
        tracing::info!(
            "🏊 Ship {} joined pool {} with {} units ({}/{} allocated)",
            ship_id,
            pool_id,
            units,
            pool.allocated_compliance_units,
            pool.total_compliance_units
        );
        Ok(member)
    }

    /// Returns the removed member, or `None` when the ship was not a member.
    pub async fn remove_member(&self, pool_id: &str, ship_id: &str) -> Result<Option<PoolMember>> {
        let _guard = self.locks.lock(pool_id).await;

        let pool = self.get_pool(pool_id).await?;
        if self.repository.find_member(pool_id, ship_id).await?.is_none() {
            return Ok(None);
        }
        pooling::ensure_open(&pool)?;

        let removed = self.repository.delete_member(pool_id, ship_id).await?;
        if let Some(member) = &removed {
            tracing::info!(
                "🏊 Ship {} left pool {}, released {} units",
                ship_id,
                pool_id,
                member.allocated_units
            );
        }
        Ok(removed)
    }

    /// Adds `units` to the ship's allocation, enrolling it first if needed.
    pub async fn allocate_units(
        &self,
        pool_id: &str,
        ship_id: &str,
        units: f64,
    ) -> Result<PoolMember> {
        let _guard = self.locks.lock(pool_id).await;

        let Some(member) = self.repository.find_member(pool_id, ship_id).await? else {
            return self.add_member_locked(pool_id, ship_id, units).await;
        };

        let pool = self.get_pool(pool_id).await?;
        pooling::ensure_open(&pool)?;
        pooling::check_allocation(&pool, units).inspect_err(|e| log_rejection(pool_id, e))?;

        let grown = pooling::grow_member(&pool, &member, units);
        self.repository.upsert_member(grown.clone(), units).await?;
        tracing::debug!(
            "🏊 Ship {} allocation in pool {} now {}",
            ship_id,
            pool_id,
            grown.allocated_units
        );
        Ok(grown)
    }

    pub async fn get_members(&self, pool_id: &str) -> Result<Vec<PoolMember>> {
        self.get_pool(pool_id).await?;
        self.repository.list_members(pool_id).await
    }

    /// Sum of the member rows, independent of the pool's own counter.
    pub async fn get_total_allocated_units(&self, pool_id: &str) -> Result<f64> {
        let members = self.get_members(pool_id).await?;
        Ok(pooling::total_allocated(&members))
    }

    /// Checks the pool counter against its member rows. A mismatch is logged
    /// and returned; nothing is corrected.
    pub async fn reconcile(&self, pool_id: &str) -> Result<PoolAudit> {
        let _guard = self.locks.lock(pool_id).await;

        let pool = self.get_pool(pool_id).await?;
        let members = self.repository.list_members(pool_id).await?;
        pooling::reconcile(&pool, &members).inspect_err(|e| {
            tracing::error!("🚨 Pool {} failed reconciliation: {}", pool_id, e);
        })
    }
}
