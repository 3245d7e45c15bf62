use crate::core::pooling;
use crate::domain::model::{
    AppliedEntry, BankEntry, BankEntryFilter, ComplianceFilter, ComplianceRecord, Pool,
    PoolMember, PoolStatus,
};
use crate::domain::ports::{BankRepository, ComplianceRepository, PoolRepository};
use crate::utils::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Flat, serializable copy of every row held by a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSnapshot {
    pub version: u32,
    pub records: Vec<ComplianceRecord>,
    pub bank_entries: Vec<BankEntry>,
    pub pools: Vec<Pool>,
    pub pool_members: Vec<PoolMember>,
}

#[derive(Debug, Default)]
struct LedgerState {
    records: HashMap<String, ComplianceRecord>,
    entries: HashMap<String, BankEntry>,
    pools: HashMap<String, Pool>,
    // (pool_id, ship_id)
    members: HashMap<(String, String), PoolMember>,
}

/// All three repositories over one lock, so writes spanning a pool and its
/// members happen under a single guard.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<LedgerState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(LedgerError::StorageError {
                message: format!(
                    "Snapshot version {} is newer than supported version {}",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }

        let mut state = LedgerState::default();
        for record in snapshot.records {
            state.records.insert(record.id.clone(), record);
        }
        for entry in snapshot.bank_entries {
            state.entries.insert(entry.id.clone(), entry);
        }
        for pool in snapshot.pools {
            state.pools.insert(pool.id.clone(), pool);
        }
        for member in snapshot.pool_members {
            if !state.pools.contains_key(&member.pool_id) {
                return Err(LedgerError::StorageError {
                    message: format!(
                        "Snapshot member {} references missing pool {}",
                        member.ship_id, member.pool_id
                    ),
                });
            }
            state
                .members
                .insert((member.pool_id.clone(), member.ship_id.clone()), member);
        }

        for pool in state.pools.values() {
            let members: Vec<PoolMember> = state
                .members
                .values()
                .filter(|m| m.pool_id == pool.id)
                .cloned()
                .collect();
            // loaded as-is; the counter is never rewritten here
            if let Err(e) = pooling::reconcile(pool, &members) {
                tracing::warn!("🚨 Snapshot pool {} loaded out of balance: {}", pool.id, e);
            }
        }

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    pub async fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read().await;

        let mut records: Vec<_> = state.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let mut bank_entries: Vec<_> = state.entries.values().cloned().collect();
        bank_entries.sort_by(|a, b| a.banked_at.cmp(&b.banked_at).then_with(|| a.id.cmp(&b.id)));
        let mut pools: Vec<_> = state.pools.values().cloned().collect();
        pools.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let mut pool_members: Vec<_> = state.members.values().cloned().collect();
        pool_members.sort_by(|a, b| {
            a.pool_id
                .cmp(&b.pool_id)
                .then(a.joined_at.cmp(&b.joined_at))
                .then_with(|| a.ship_id.cmp(&b.ship_id))
        });

        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            records,
            bank_entries,
            pools,
            pool_members,
        }
    }
}

#[async_trait]
impl ComplianceRepository for MemoryStore {
    async fn find_record(&self, id: &str) -> Result<Option<ComplianceRecord>> {
        Ok(self.state.read().await.records.get(id).cloned())
    }

    async fn list_records(&self, filter: &ComplianceFilter) -> Result<Vec<ComplianceRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<_> = state
            .records
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn insert_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord> {
        let mut state = self.state.write().await;
        state.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn insert_records(&self, records: Vec<ComplianceRecord>) -> Result<Vec<ComplianceRecord>> {
        let mut state = self.state.write().await;
        for record in &records {
            state.records.insert(record.id.clone(), record.clone());
        }
        Ok(records)
    }

    async fn update_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord> {
        let mut state = self.state.write().await;
        match state.records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(record)
            }
            None => Err(LedgerError::not_found("ComplianceRecord", &record.id)),
        }
    }

    async fn delete_record(&self, id: &str) -> Result<bool> {
        Ok(self.state.write().await.records.remove(id).is_some())
    }
}

#[async_trait]
impl BankRepository for MemoryStore {
    async fn list_entries(&self, filter: &BankEntryFilter) -> Result<Vec<BankEntry>> {
        let now = Utc::now();
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .entries
            .values()
            .filter(|e| filter.matches(e, now))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.banked_at.cmp(&a.banked_at));
        Ok(entries)
    }

    async fn insert_entry(&self, entry: BankEntry) -> Result<BankEntry> {
        let mut state = self.state.write().await;
        state.entries.insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn consume_entries(&self, consumed: &[AppliedEntry]) -> Result<()> {
        let mut state = self.state.write().await;

        // check everything first so a bad item leaves every entry untouched
        for applied in consumed {
            let entry = state
                .entries
                .get(&applied.id)
                .ok_or_else(|| LedgerError::not_found("BankEntry", &applied.id))?;
            if applied.units_applied < 0.0
                || applied.units_applied > entry.remaining_units + 1e-9
            {
                return Err(LedgerError::validation(
                    "units_applied",
                    applied.units_applied,
                    format!(
                        "Entry {} only has {} units remaining",
                        entry.id, entry.remaining_units
                    ),
                ));
            }
        }

        for applied in consumed {
            if let Some(entry) = state.entries.get_mut(&applied.id) {
                entry.remaining_units = (entry.remaining_units - applied.units_applied).max(0.0);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PoolRepository for MemoryStore {
    async fn find_pool(&self, id: &str) -> Result<Option<Pool>> {
        Ok(self.state.read().await.pools.get(id).cloned())
    }

    async fn list_pools(&self, status: Option<PoolStatus>) -> Result<Vec<Pool>> {
        let state = self.state.read().await;
        let mut pools: Vec<_> = state
            .pools
            .values()
            .filter(|p| status.is_none_or(|s| s == p.status))
            .cloned()
            .collect();
        pools.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pools)
    }

    async fn list_pools_for_ship(&self, ship_id: &str) -> Result<Vec<Pool>> {
        let state = self.state.read().await;
        let mut pools: Vec<_> = state
            .members
            .values()
            .filter(|m| m.ship_id == ship_id)
            .filter_map(|m| state.pools.get(&m.pool_id).cloned())
            .collect();
        pools.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pools)
    }

    async fn insert_pool(&self, pool: Pool) -> Result<Pool> {
        let mut state = self.state.write().await;
        state.pools.insert(pool.id.clone(), pool.clone());
        Ok(pool)
    }

    async fn update_pool(&self, pool: Pool, members: Vec<PoolMember>) -> Result<Pool> {
        let mut state = self.state.write().await;
        if !state.pools.contains_key(&pool.id) {
            return Err(LedgerError::not_found("Pool", &pool.id));
        }
        for member in &members {
            let key = (member.pool_id.clone(), member.ship_id.clone());
            if member.pool_id != pool.id || !state.members.contains_key(&key) {
                return Err(LedgerError::not_found(
                    "PoolMember",
                    &format!("{}/{}", member.pool_id, member.ship_id),
                ));
            }
        }

        for member in members {
            state
                .members
                .insert((member.pool_id.clone(), member.ship_id.clone()), member);
        }
        state.pools.insert(pool.id.clone(), pool.clone());
        Ok(pool)
    }

    async fn delete_pool(&self, id: &str) -> Result<usize> {
        let mut state = self.state.write().await;
        if state.pools.remove(id).is_none() {
            return Err(LedgerError::not_found("Pool", id));
        }
        let before = state.members.len();
        state.members.retain(|(pool_id, _), _| pool_id != id);
        Ok(before - state.members.len())
    }

    async fn find_member(&self, pool_id: &str, ship_id: &str) -> Result<Option<PoolMember>> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(&(pool_id.to_string(), ship_id.to_string()))
            .cloned())
    }

    async fn list_members(&self, pool_id: &str) -> Result<Vec<PoolMember>> {
        let state = self.state.read().await;
        let mut members: Vec<_> = state
            .members
            .values()
            .filter(|m| m.pool_id == pool_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.ship_id.cmp(&b.ship_id)));
        Ok(members)
    }

    async fn upsert_member(&self, member: PoolMember, delta: f64) -> Result<Pool> {
        let mut state = self.state.write().await;
        let pool = state
            .pools
            .get_mut(&member.pool_id)
            .ok_or_else(|| LedgerError::not_found("Pool", &member.pool_id))?;

        pool.allocated_compliance_units += delta;
        pool.updated_at = Utc::now();
        let pool = pool.clone();

        state
            .members
            .insert((member.pool_id.clone(), member.ship_id.clone()), member);
        Ok(pool)
    }

    async fn delete_member(&self, pool_id: &str, ship_id: &str) -> Result<Option<PoolMember>> {
        let mut state = self.state.write().await;
        if !state.pools.contains_key(pool_id) {
            return Err(LedgerError::not_found("Pool", pool_id));
        }

        let removed = state
            .members
            .remove(&(pool_id.to_string(), ship_id.to_string()));
        if let (Some(member), Some(pool)) = (&removed, state.pools.get_mut(pool_id)) {
            pool.allocated_compliance_units -= member.allocated_units;
            pool.updated_at = Utc::now();
        }
        Ok(removed)
    }
}
