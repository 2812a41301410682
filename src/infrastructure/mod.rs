//! Adapters behind the domain ports: storage backends and the HTTP payment
//! provider.

pub mod chapa;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;

use crate::domain::ports::StoreHandle;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Opens the configured store: RocksDB when a path is given and the
/// `storage-rocksdb` feature is compiled in, in-memory otherwise.
pub fn open_store(db_path: Option<&Path>) -> Result<StoreHandle> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            info!(path = %path.display(), "opening RocksDB store");
            Ok(Arc::new(rocksdb::RocksDBStore::open(path)?))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(path) => {
            tracing::warn!(
                path = %path.display(),
                "'storage-rocksdb' feature is disabled; falling back to in-memory storage"
            );
            Ok(Arc::new(in_memory::InMemoryStore::new()))
        }
        None => {
            info!("using in-memory store");
            Ok(Arc::new(in_memory::InMemoryStore::new()))
        }
    }
}
