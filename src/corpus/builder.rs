//! One-time corpus build step.
//!
//! Building a corpus computes everything later requests read from
//! metadata: per-document token counts, last token positions, and
//! per-token-type totals. The totals come from building the aggregate term
//! table once up front, which also pre-populates the cache so the first
//! analytics request does not race other requests into building it.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};

use crate::aggregate::TermAggregates;
use crate::corpus::{Corpus, CorpusMetadata, TokenType, TokenTypeCounts, corpus_id, storage_key};
use crate::error::{ConcordError, Result};
use crate::index::IndexReader;
use crate::mapper::CorpusMapper;
use crate::storage::Storage;

/// Builds and persists corpora.
pub struct CorpusBuilder {
    storage: Arc<dyn Storage>,
}

impl CorpusBuilder {
    /// Create a builder over the given storage.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        CorpusBuilder { storage }
    }

    /// Build the corpus for an ordered document-id list, or open it if it
    /// was already built.
    ///
    /// The store step uses the storage backend's atomic create-if-absent,
    /// so two concurrent builders of the same document set end up sharing
    /// one stored corpus; the loser discards its computation and opens the
    /// winner's.
    pub fn build(
        &self,
        index: &Arc<dyn IndexReader>,
        document_ids: Vec<String>,
    ) -> Result<Corpus> {
        if document_ids.is_empty() {
            return Err(ConcordError::invalid_argument(
                "a corpus requires at least one document",
            ));
        }
        let id = corpus_id(&document_ids);
        if Corpus::exists(self.storage.as_ref(), &id) {
            debug!("corpus '{id}' already built");
            return Corpus::open(self.storage.as_ref(), &id);
        }

        let started = Instant::now();
        let mut metadata = CorpusMetadata::new(id.clone(), document_ids);
        let provisional = Corpus::from_metadata(metadata.clone());
        let mapper = CorpusMapper::new(index.clone(), &provisional)?;

        for token_type in TokenType::all() {
            metadata
                .counts
                .insert(token_type, self.count_token_type(&mapper, token_type)?);
        }

        info!(
            "built corpus '{id}' ({} documents) in {:?}",
            metadata.document_ids.len(),
            started.elapsed()
        );

        let encoded = serde_json::to_vec(&metadata)?;
        if !self.storage.create_if_absent(&storage_key(&id), &encoded)? {
            debug!("corpus '{id}' was built concurrently; using stored copy");
            return Corpus::open(self.storage.as_ref(), &id);
        }
        Ok(Corpus::from_metadata(metadata))
    }

    fn count_token_type(
        &self,
        mapper: &CorpusMapper<'_>,
        token_type: TokenType,
    ) -> Result<TokenTypeCounts> {
        let mut document_token_counts = Vec::with_capacity(mapper.doc_refs().len());
        let mut last_token_positions = Vec::with_capacity(mapper.doc_refs().len());
        for &doc in mapper.doc_refs() {
            match mapper.term_vector(doc, token_type)? {
                Some(vector) => {
                    document_token_counts.push(vector.token_count());
                    last_token_positions.push(vector.last_position().unwrap_or(0));
                }
                None => {
                    document_token_counts.push(0);
                    last_token_positions.push(0);
                }
            }
        }

        let aggregates = TermAggregates::open(mapper, token_type, &self.storage)?;
        let tokens = aggregates.values().map(|r| r.raw_freq).sum();
        let types = aggregates.len() as u64;
        aggregates.close();

        Ok(TokenTypeCounts {
            tokens,
            types,
            document_token_counts,
            last_token_positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::storage::memory::{MemoryStorage, MemoryStorageConfig};

    fn setup() -> (Arc<dyn IndexReader>, Arc<dyn Storage>) {
        let index = MemoryIndex::new();
        index.add_document("d0", "the whale the whale sank").unwrap();
        index.add_document("d1", "a ship").unwrap();
        index.add_document("d2", "3 whales").unwrap();
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        (Arc::new(index), Arc::new(storage))
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_computes_counts() {
        let (index, storage) = setup();
        let builder = CorpusBuilder::new(storage.clone());
        let corpus = builder.build(&index, ids(&["d0", "d2"])).unwrap();

        assert_eq!(corpus.size(), 2);
        // d0 has 5 lexical tokens, d2 has 1 ("whales"; "3" is not lexical).
        assert_eq!(corpus.document_token_counts(TokenType::Lexical), &[5, 1]);
        assert_eq!(corpus.tokens_count(TokenType::Lexical), 6);
        // Distinct lexical types: the, whale, sank, whales.
        assert_eq!(corpus.types_count(TokenType::Lexical), 4);
        // The "all" field keeps the numeral.
        assert_eq!(corpus.document_token_counts(TokenType::All), &[5, 2]);
        assert_eq!(corpus.last_token_positions(TokenType::All), &[4, 1]);
    }

    #[test]
    fn test_build_is_idempotent() {
        let (index, storage) = setup();
        let builder = CorpusBuilder::new(storage.clone());
        let first = builder.build(&index, ids(&["d0", "d1"])).unwrap();
        let second = builder.build(&index, ids(&["d0", "d1"])).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(first.created(), second.created());
    }

    #[test]
    fn test_build_then_open() {
        let (index, storage) = setup();
        let builder = CorpusBuilder::new(storage.clone());
        let built = builder.build(&index, ids(&["d1"])).unwrap();
        let opened = Corpus::open(storage.as_ref(), built.id()).unwrap();
        assert_eq!(opened.document_ids(), built.document_ids());
        assert_eq!(
            opened.tokens_count(TokenType::Lexical),
            built.tokens_count(TokenType::Lexical)
        );
    }

    #[test]
    fn test_empty_corpus_rejected() {
        let (index, storage) = setup();
        let builder = CorpusBuilder::new(storage);
        assert!(matches!(
            builder.build(&index, Vec::new()),
            Err(ConcordError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_build_prepopulates_aggregate_cache() {
        let (index, storage) = setup();
        let builder = CorpusBuilder::new(storage.clone());
        builder.build(&index, ids(&["d0"])).unwrap();
        assert_eq!(storage.list("termagg_").unwrap().len(), 2);
    }
}
