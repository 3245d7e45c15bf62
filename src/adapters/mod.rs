// Adapters layer: concrete implementations of the domain ports.

pub mod csv_import;
pub mod memory;
pub mod snapshot;
pub mod storage;

pub use memory::{LedgerSnapshot, MemoryStore};
pub use snapshot::SnapshotFile;
pub use storage::LocalStorage;
