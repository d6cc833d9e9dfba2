//! Pluggable blob storage backends.
//!
//! Corpus definitions, stopword lists and the aggregate term cache are small
//! named blobs. The [`Storage`] trait abstracts where they live so that the
//! analytics engines work identically over an in-memory map (tests,
//! ephemeral sessions) or a directory on disk.

pub mod file;
pub mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::storage::file::{FileStorage, FileStorageConfig};
use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

/// A key/value blob store.
///
/// Keys are flat strings; backends may sanitize them for their medium but
/// must keep distinct keys distinct for the key alphabet used by this crate
/// (alphanumerics, `-`, `_`, `.`).
pub trait Storage: Send + Sync + Debug {
    /// Check whether a blob exists.
    fn exists(&self, key: &str) -> bool;

    /// Read a blob, failing with `NotFound` if it does not exist.
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Write a blob, replacing any previous content.
    fn write(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Atomically create a blob only if the key is not already present.
    ///
    /// Returns `true` if this call created the blob, `false` if another
    /// writer got there first. The existence check and the write are a
    /// single atomic step; two concurrent callers can never both observe
    /// `true` for the same key.
    fn create_if_absent(&self, key: &str, data: &[u8]) -> Result<bool>;

    /// Delete a blob. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    /// List all keys starting with the given prefix.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Configuration for creating a storage backend.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// In-memory storage.
    Memory(MemoryStorageConfig),
    /// File-system storage rooted at a directory.
    File(FileStorageConfig),
}

/// Factory for creating storage backends from configuration.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a storage backend for the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(config) => Ok(Arc::new(MemoryStorage::new(config))),
            StorageConfig::File(config) => Ok(Arc::new(FileStorage::new(config)?)),
        }
    }
}
