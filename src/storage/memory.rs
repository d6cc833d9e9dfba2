//! In-memory storage backend.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{ConcordError, Result};
use crate::storage::Storage;

/// Configuration for [`MemoryStorage`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageConfig {
    /// Initial capacity hint for the blob map.
    pub initial_capacity: usize,
}

/// A storage backend that keeps all blobs in a process-local map.
///
/// Primarily used by tests and short-lived analysis sessions where nothing
/// needs to survive the process.
#[derive(Debug)]
pub struct MemoryStorage {
    blobs: RwLock<AHashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Create a new empty in-memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            blobs: RwLock::new(AHashMap::with_capacity(config.initial_capacity)),
        }
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, key: &str) -> bool {
        self.blobs.read().contains_key(key)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| ConcordError::not_found(key))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        self.blobs.write().insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn create_if_absent(&self, key: &str, data: &[u8]) -> Result<bool> {
        // The write lock makes the check and the insert one atomic step.
        let mut blobs = self.blobs.write();
        if blobs.contains_key(key) {
            return Ok(false);
        }
        blobs.insert(key.to_string(), data.to_vec());
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_roundtrip() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        storage.write("a", b"alpha").unwrap();
        assert_eq!(storage.read("a").unwrap(), b"alpha");
        assert!(storage.exists("a"));
        assert!(!storage.exists("b"));
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        assert!(matches!(
            storage.read("missing"),
            Err(ConcordError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_if_absent() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        assert!(storage.create_if_absent("k", b"first").unwrap());
        assert!(!storage.create_if_absent("k", b"second").unwrap());
        // The loser's content must not clobber the winner's.
        assert_eq!(storage.read("k").unwrap(), b"first");
    }

    #[test]
    fn test_list_by_prefix() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        storage.write("corpus_a", b"1").unwrap();
        storage.write("corpus_b", b"2").unwrap();
        storage.write("cache_a", b"3").unwrap();
        assert_eq!(storage.list("corpus_").unwrap(), vec!["corpus_a", "corpus_b"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        storage.write("k", b"v").unwrap();
        storage.delete("k").unwrap();
        storage.delete("k").unwrap();
        assert!(!storage.exists("k"));
    }
}
