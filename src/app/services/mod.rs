pub mod banking_ledger;
pub mod compliance_service;
pub mod pool_allocator;

pub use banking_ledger::BankingLedger;
pub use compliance_service::ComplianceService;
pub use pool_allocator::PoolAllocator;
