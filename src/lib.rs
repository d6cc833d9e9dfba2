//! # Concord
//!
//! A corpus-analytics engine that sits atop an inverted-index search
//! backend and computes term- and collocation-level statistics over a
//! user-defined subset of documents (a corpus).
//!
//! ## Features
//!
//! - Stable corpus positions over an index shared by many corpora
//! - Cached whole-corpus term aggregates, keyed by corpus and index
//!   version
//! - Ranked term statistics with optional per-document distributions and
//!   shape statistics (skewness, peakedness)
//! - Context-window collocate extraction around keyword matches
//! - Pluggable storage backends
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use concord::corpus::TokenType;
//! use concord::corpus::builder::CorpusBuilder;
//! use concord::index::IndexReader;
//! use concord::index::memory::MemoryIndex;
//! use concord::mapper::CorpusMapper;
//! use concord::storage::Storage;
//! use concord::storage::memory::{MemoryStorage, MemoryStorageConfig};
//! use concord::terms::{CorpusTerms, CorpusTermsRequest};
//!
//! # fn main() -> concord::Result<()> {
//! let index = MemoryIndex::new();
//! index.add_document("melville", "the white whale sank the ship")?;
//! index.add_document("verne", "the squid wrapped the ship")?;
//! let index: Arc<dyn IndexReader> = Arc::new(index);
//!
//! let storage: Arc<dyn Storage> =
//!     Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
//! let corpus = CorpusBuilder::new(storage.clone())
//!     .build(&index, vec!["melville".into(), "verne".into()])?;
//!
//! let mapper = CorpusMapper::new(index, &corpus)?;
//! let request = CorpusTermsRequest::new(TokenType::Lexical)
//!     .with_queries(["whale", "ship"]);
//! let results = CorpusTerms::new(request).execute(&mapper, &storage)?;
//! assert_eq!(results[0].term, "ship");
//! assert_eq!(results[0].raw_freq, 2);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod aggregate;
pub mod analysis;
pub mod collocates;
pub mod corpus;
mod error;
pub mod index;
pub mod mapper;
pub mod ranker;
pub mod stats;
pub mod storage;
pub mod terms;

// Re-exports for the public API
pub use aggregate::{TermAggregateRecord, TermAggregates};
pub use collocates::{Collocate, CollocateSort, Collocates, CollocatesRequest};
pub use corpus::builder::CorpusBuilder;
pub use corpus::stopwords::StopwordSet;
pub use corpus::{Corpus, CorpusMetadata, TokenType};
pub use error::{ConcordError, Result};
pub use index::memory::MemoryIndex;
pub use index::query::Query;
pub use index::{DocHit, DocRef, DocScope, IndexReader, SpanHit, TermVector};
pub use mapper::CorpusMapper;
pub use ranker::BoundedRanker;
pub use storage::{Storage, StorageConfig, StorageFactory};
pub use terms::{CorpusTerms, CorpusTermsRequest, DistributionsMode, TermResult, TermSort};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
