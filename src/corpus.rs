//! Corpus model: an immutable, ordered subset of indexed documents.
//!
//! A corpus assigns each of its documents a stable zero-based position.
//! Every per-document array produced by the analytics engines is indexed by
//! that position, never by index-internal document references, so results
//! are reproducible regardless of how the physical index orders documents.

pub mod builder;
pub mod stopwords;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::Storage;

/// A category of text units drawn from the index.
///
/// Each token type corresponds to its own indexed field with its own token
/// positions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, PartialOrd, Ord,
)]
pub enum TokenType {
    /// Lexical word tokens, the default for word-frequency statistics.
    #[default]
    Lexical,
    /// Every token, including numerals.
    All,
}

impl TokenType {
    /// All token types, in a fixed order.
    pub fn all() -> [TokenType; 2] {
        [TokenType::Lexical, TokenType::All]
    }

    /// Stable name used in storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Lexical => "lexical",
            TokenType::All => "all",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate counts for one token type, computed once at corpus build time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenTypeCounts {
    /// Total tokens across the corpus.
    pub tokens: u64,
    /// Total distinct terms across the corpus.
    pub types: u64,
    /// Per-document token counts, indexed by corpus position.
    pub document_token_counts: Vec<u64>,
    /// Per-document last valid token position, indexed by corpus position.
    /// Zero for empty documents (their token count is also zero).
    pub last_token_positions: Vec<u32>,
}

/// Persisted corpus definition and build-time aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusMetadata {
    /// Stable corpus id, derived from the document-id sequence.
    pub id: String,
    /// External document ids in corpus-position order.
    pub document_ids: Vec<String>,
    /// When the corpus was built.
    pub created: DateTime<Utc>,
    /// Per-token-type aggregates.
    pub counts: HashMap<TokenType, TokenTypeCounts>,
}

impl CorpusMetadata {
    /// Create metadata with empty counts; the builder fills them in.
    pub fn new(id: String, document_ids: Vec<String>) -> Self {
        CorpusMetadata {
            id,
            document_ids,
            created: Utc::now(),
            counts: HashMap::new(),
        }
    }
}

/// An immutable ordered sequence of documents selected for analysis.
///
/// Built once by [`builder::CorpusBuilder`], persisted, and read by many
/// subsequent requests.
#[derive(Debug, Clone)]
pub struct Corpus {
    metadata: CorpusMetadata,
}

impl Corpus {
    /// Wrap already-built metadata.
    pub fn from_metadata(metadata: CorpusMetadata) -> Self {
        Corpus { metadata }
    }

    /// Open a stored corpus by id.
    pub fn open(storage: &dyn Storage, id: &str) -> Result<Corpus> {
        let bytes = storage.read(&storage_key(id))?;
        let metadata: CorpusMetadata = serde_json::from_slice(&bytes)?;
        Ok(Corpus { metadata })
    }

    /// Whether a corpus with this id has been stored.
    pub fn exists(storage: &dyn Storage, id: &str) -> bool {
        storage.exists(&storage_key(id))
    }

    /// The stable corpus id.
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Number of documents.
    pub fn size(&self) -> usize {
        self.metadata.document_ids.len()
    }

    /// External document ids in corpus-position order.
    pub fn document_ids(&self) -> &[String] {
        &self.metadata.document_ids
    }

    /// When the corpus was built.
    pub fn created(&self) -> DateTime<Utc> {
        self.metadata.created
    }

    /// Total token count for a token type.
    pub fn tokens_count(&self, token_type: TokenType) -> u64 {
        self.counts(token_type).map(|c| c.tokens).unwrap_or(0)
    }

    /// Total distinct term count for a token type.
    pub fn types_count(&self, token_type: TokenType) -> u64 {
        self.counts(token_type).map(|c| c.types).unwrap_or(0)
    }

    /// Per-document token counts, indexed by corpus position.
    pub fn document_token_counts(&self, token_type: TokenType) -> &[u64] {
        self.counts(token_type)
            .map(|c| c.document_token_counts.as_slice())
            .unwrap_or(&[])
    }

    /// Per-document last token positions, indexed by corpus position.
    pub fn last_token_positions(&self, token_type: TokenType) -> &[u32] {
        self.counts(token_type)
            .map(|c| c.last_token_positions.as_slice())
            .unwrap_or(&[])
    }

    /// The underlying metadata.
    pub fn metadata(&self) -> &CorpusMetadata {
        &self.metadata
    }

    fn counts(&self, token_type: TokenType) -> Option<&TokenTypeCounts> {
        self.metadata.counts.get(&token_type)
    }
}

/// Storage key for a corpus id.
pub(crate) fn storage_key(id: &str) -> String {
    format!("corpus_{id}.json")
}

/// Derive the stable corpus id from an ordered document-id sequence.
///
/// FNV-1a over the ids with a separator byte; order-sensitive, so the same
/// documents in a different order form a different corpus.
pub fn corpus_id(document_ids: &[String]) -> String {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for id in document_ids {
        for byte in id.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(PRIME);
        }
        hash ^= 0x1f;
        hash = hash.wrapping_mul(PRIME);
    }
    format!("{hash:016x}")
}
