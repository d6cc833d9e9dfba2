//! Stopword sets.
//!
//! A stopword set is a membership test over term strings. The default is
//! empty (no filtering). Named lists can be persisted through the storage
//! backend, one word per line, `#` for comments.

use ahash::AHashSet;

use crate::error::Result;
use crate::storage::Storage;

/// A set of terms excluded from all-terms enumeration and collocate
/// windows.
#[derive(Debug, Clone, Default)]
pub struct StopwordSet {
    words: AHashSet<String>,
}

impl StopwordSet {
    /// An empty set: nothing is filtered.
    pub fn empty() -> Self {
        StopwordSet::default()
    }

    /// Build a set from explicit words. Words are lowercased to match the
    /// analysis pipeline.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopwordSet {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Load a stored stopword list by id.
    pub fn load(storage: &dyn Storage, list_id: &str) -> Result<Self> {
        let bytes = storage.read(&storage_key(list_id))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(Self::from_words(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        ))
    }

    /// Persist a stopword list under an id.
    pub fn store(storage: &dyn Storage, list_id: &str, words: &[&str]) -> Result<()> {
        storage.write(&storage_key(list_id), words.join("\n").as_bytes())
    }

    /// Whether a term is filtered out.
    pub fn is_stopword(&self, term: &str) -> bool {
        self.words.contains(term)
    }

    /// Whether the set filters nothing.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of stopwords.
    pub fn len(&self) -> usize {
        self.words.len()
    }
}

fn storage_key(list_id: &str) -> String {
    format!("stopwords_{list_id}.txt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    #[test]
    fn test_empty_filters_nothing() {
        let stopwords = StopwordSet::empty();
        assert!(!stopwords.is_stopword("the"));
        assert!(stopwords.is_empty());
    }

    #[test]
    fn test_from_words_lowercases() {
        let stopwords = StopwordSet::from_words(["The", "AND"]);
        assert!(stopwords.is_stopword("the"));
        assert!(stopwords.is_stopword("and"));
        assert!(!stopwords.is_stopword("whale"));
    }

    #[test]
    fn test_load_stored_list() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        storage
            .write(
                "stopwords_english.txt",
                b"# common words\nthe\n  and  \n\nof",
            )
            .unwrap();
        let stopwords = StopwordSet::load(&storage, "english").unwrap();
        assert_eq!(stopwords.len(), 3);
        assert!(stopwords.is_stopword("of"));
        assert!(!stopwords.is_stopword("# common words"));
    }

    #[test]
    fn test_store_then_load() {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        StopwordSet::store(&storage, "tiny", &["a", "b"]).unwrap();
        let stopwords = StopwordSet::load(&storage, "tiny").unwrap();
        assert!(stopwords.is_stopword("a"));
        assert!(stopwords.is_stopword("b"));
    }
}
