pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{LocalStorage, MemoryStore};
pub use app::services::{BankingLedger, ComplianceService, PoolAllocator};
pub use config::LedgerConfig;
pub use core::balance::{compute_balance, compute_comparison, Regulation};
pub use core::banking::{apply_banked, bank_surplus};
pub use core::engine::LedgerEngine;
pub use core::metrics::compute_metrics;
pub use core::pooling::create_pool;
pub use utils::error::{LedgerError, Result};
