//! File-system storage backend.
//!
//! Each blob is a file under the configured root directory. Writes go
//! through a temporary file followed by a rename so that readers never see
//! a half-written blob; `create_if_absent` relies on the file system's
//! create-new semantics for its atomicity.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ConcordError, Result};
use crate::storage::Storage;

/// Configuration for [`FileStorage`].
#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    /// Root directory holding the blobs. Created if missing.
    pub path: PathBuf,
}

impl FileStorageConfig {
    /// Create a configuration rooted at the given directory.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStorageConfig {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// A storage backend that keeps each blob as a file in one directory.
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file storage, creating the root directory if needed.
    pub fn new(config: FileStorageConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        Ok(FileStorage { root: config.path })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys used by this crate are already file-name safe; anything else
        // is flattened so a key can never escape the root directory.
        let sanitized: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(sanitized)
    }
}

impl Storage for FileStorage {
    fn exists(&self, key: &str) -> bool {
        self.path_for(key).is_file()
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key);
        if !path.is_file() {
            return Err(ConcordError::not_found(key));
        }
        Ok(fs::read(path)?)
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .map_err(|e| ConcordError::storage(format!("temp file for '{key}': {e}")))?;
        tmp.write_all(data)?;
        tmp.persist(self.path_for(key))
            .map_err(|e| ConcordError::storage(format!("persist '{key}': {e}")))?;
        Ok(())
    }

    fn create_if_absent(&self, key: &str, data: &[u8]) -> Result<bool> {
        let path = self.path_for(key);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                file.write_all(data)?;
                file.sync_all()?;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(name) = name.to_str()
                && name.starts_with(prefix)
            {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(FileStorageConfig::new(dir.path())).unwrap();
        (dir, storage)
    }

    #[test]
    fn test_read_write_roundtrip() {
        let (_dir, storage) = storage();
        storage.write("corpus_abc.json", b"{}").unwrap();
        assert_eq!(storage.read("corpus_abc.json").unwrap(), b"{}");
    }

    #[test]
    fn test_overwrite_replaces_content() {
        let (_dir, storage) = storage();
        storage.write("k", b"one").unwrap();
        storage.write("k", b"two").unwrap();
        assert_eq!(storage.read("k").unwrap(), b"two");
    }

    #[test]
    fn test_create_if_absent_loses_to_existing() {
        let (_dir, storage) = storage();
        assert!(storage.create_if_absent("k", b"first").unwrap());
        assert!(!storage.create_if_absent("k", b"second").unwrap());
        assert_eq!(storage.read("k").unwrap(), b"first");
    }

    #[test]
    fn test_key_sanitization_stays_in_root() {
        let (dir, storage) = storage();
        storage.write("../escape", b"x").unwrap();
        // The blob must land inside the root, under a flattened name.
        assert!(storage.exists("../escape"));
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    fn test_list_by_prefix() {
        let (_dir, storage) = storage();
        storage.write("cache_a", b"1").unwrap();
        storage.write("cache_b", b"2").unwrap();
        storage.write("corpus_a", b"3").unwrap();
        assert_eq!(storage.list("cache_").unwrap(), vec!["cache_a", "cache_b"]);
    }
}
