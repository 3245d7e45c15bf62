use crate::core::balance::Regulation;
use crate::domain::model::{
    AppliedEntry, BankEntry, BankEntryFilter, ComplianceFilter, ComplianceRecord, Pool,
    PoolMember, PoolStatus,
};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn default_target_ghg_intensity(&self) -> f64;
    fn target_ghg_intensity(&self, reporting_period: &str) -> f64;
    fn energy_conversion_factor(&self) -> f64;
    fn regulation(&self) -> Regulation;
    fn banking_validity_years(&self) -> u32;
    fn max_banking_capacity(&self) -> Option<f64>;
    fn snapshot_file(&self) -> &str;
}

#[async_trait]
pub trait ComplianceRepository: Send + Sync {
    async fn find_record(&self, id: &str) -> Result<Option<ComplianceRecord>>;
    /// Newest first.
    async fn list_records(&self, filter: &ComplianceFilter) -> Result<Vec<ComplianceRecord>>;
    async fn insert_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord>;
    /// Stores every record or none of them.
    async fn insert_records(&self, records: Vec<ComplianceRecord>) -> Result<Vec<ComplianceRecord>>;
    async fn update_record(&self, record: ComplianceRecord) -> Result<ComplianceRecord>;
    async fn delete_record(&self, id: &str) -> Result<bool>;
}

#[async_trait]
pub trait BankRepository: Send + Sync {
    /// Ordered by `banked_at`, newest first.
    async fn list_entries(&self, filter: &BankEntryFilter) -> Result<Vec<BankEntry>>;
    async fn insert_entry(&self, entry: BankEntry) -> Result<BankEntry>;
    /// Applies every consumption or none of them.
    async fn consume_entries(&self, consumed: &[AppliedEntry]) -> Result<()>;
}

/// Pool rows plus their member rows. Every method that touches both a member
/// and the pool counter must do so atomically.
#[async_trait]
pub trait PoolRepository: Send + Sync {
    async fn find_pool(&self, id: &str) -> Result<Option<Pool>>;
    /// Newest first.
    async fn list_pools(&self, status: Option<PoolStatus>) -> Result<Vec<Pool>>;
    async fn list_pools_for_ship(&self, ship_id: &str) -> Result<Vec<Pool>>;
    async fn insert_pool(&self, pool: Pool) -> Result<Pool>;
    /// Replaces the pool row and the given members' rows together.
    async fn update_pool(&self, pool: Pool, members: Vec<PoolMember>) -> Result<Pool>;
    /// Deletes the pool and all of its members; returns how many members went with it.
    async fn delete_pool(&self, id: &str) -> Result<usize>;

    async fn find_member(&self, pool_id: &str, ship_id: &str) -> Result<Option<PoolMember>>;
    /// Ordered by `joined_at`.
    async fn list_members(&self, pool_id: &str) -> Result<Vec<PoolMember>>;
    /// Inserts or replaces the member row and adds `delta` to the pool's
    /// allocated counter.
    async fn upsert_member(&self, member: PoolMember, delta: f64) -> Result<Pool>;
    /// Deletes the member row and subtracts its allocation from the counter.
    async fn delete_member(&self, pool_id: &str, ship_id: &str) -> Result<Option<PoolMember>>;
}
