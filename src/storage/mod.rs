pub mod backend;
pub mod flat_file;
pub mod migration;
mod models;
pub mod pool;
pub mod relational;
pub mod transfer;

#[cfg(test)]
mod contract;

pub use backend::{PersistenceBackend, Result, StorageError};
pub use flat_file::FlatFileBackend;
pub use models::*;
pub use pool::{BackendPool, PooledBackend, SharedBackend};
pub use relational::{DatabaseLocation, RelationalBackend};
pub use transfer::{export_user, export_user_to_json, transfer, TransferReport, UserExport};
