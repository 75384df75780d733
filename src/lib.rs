//! Booking marketplace core: artist availability and pricing, the booking
//! lifecycle, a wallet ledger with withdrawals, and event ticketing.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
pub mod telemetry;

use domain::ports::SharedStore;
use infrastructure::in_memory::InMemoryStore;
use std::path::Path;
use std::sync::Arc;

/// Opens the store the binary runs against.
///
/// With a path and the `storage-rocksdb` feature this is RocksDB; otherwise
/// an in-memory store, with a warning if a path was asked for.
pub fn open_store(db_path: Option<&Path>) -> error::Result<SharedStore> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = infrastructure::rocksdb::RocksDBStore::open(path)?;
            tracing::info!(path = %path.display(), "using RocksDB storage");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryStore::new()))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}
