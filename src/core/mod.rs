pub mod balance;
pub mod banking;
pub mod engine;
pub mod metrics;
pub mod pooling;

pub use crate::domain::model::{
    BankEntry, ComplianceRecord, Pool, PoolMember,
};
pub use crate::domain::ports::{ConfigProvider, Storage};
pub use crate::utils::error::Result;

/// Relative slack allowed when comparing unit sums.
pub const UNIT_TOLERANCE: f64 = 1e-9;

/// Absolute slack for sums on the order of `scale`.
pub(crate) fn unit_slack(scale: f64) -> f64 {
    UNIT_TOLERANCE * scale.abs().max(1.0)
}
