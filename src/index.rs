//! The index backend capability contract.
//!
//! The analytics engines never touch postings or term dictionaries
//! directly; everything they need from the physical inverted index is
//! expressed by the [`IndexReader`] trait: per-document term vectors,
//! scoped query evaluation, scoped positional (span) evaluation, and a
//! version number for cache keying. [`memory::MemoryIndex`] is the
//! reference implementation used by tests and small in-process sessions.

pub mod memory;
pub mod query;

use std::fmt::Debug;

use ahash::AHashMap;
use bit_vec::BitVec;

use crate::corpus::TokenType;
use crate::error::Result;
use crate::index::query::Query;

/// An index-internal document reference.
///
/// Document references are only meaningful to the index that issued them;
/// analytics code converts them to corpus positions through the
/// [`CorpusMapper`](crate::mapper::CorpusMapper) before indexing any
/// per-document array.
pub type DocRef = u64;

/// Frequency and ordered token positions of one distinct term within one
/// document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermVectorEntry {
    /// Number of occurrences of the term in the document.
    pub freq: u64,
    /// Token positions of those occurrences, ascending.
    pub positions: Vec<u32>,
}

/// A per-document mapping from distinct terms to frequency and positions.
#[derive(Debug, Clone, Default)]
pub struct TermVector {
    terms: AHashMap<String, TermVectorEntry>,
}

impl TermVector {
    /// Build a term vector from an ordered token sequence.
    pub fn from_tokens(tokens: &[String]) -> Self {
        let mut terms: AHashMap<String, TermVectorEntry> = AHashMap::new();
        for (position, token) in tokens.iter().enumerate() {
            let entry = terms.entry(token.clone()).or_insert_with(|| TermVectorEntry {
                freq: 0,
                positions: Vec::new(),
            });
            entry.freq += 1;
            entry.positions.push(position as u32);
        }
        TermVector { terms }
    }

    /// Look up one term's entry.
    pub fn get(&self, term: &str) -> Option<&TermVectorEntry> {
        self.terms.get(term)
    }

    /// Iterate over all distinct terms and their entries.
    ///
    /// Iteration order is unspecified; callers that need determinism must
    /// order by corpus position or term text themselves.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermVectorEntry)> {
        self.terms.iter().map(|(t, e)| (t.as_str(), e))
    }

    /// Number of distinct terms.
    pub fn distinct_terms(&self) -> usize {
        self.terms.len()
    }

    /// Total token count of the document (sum of all frequencies).
    pub fn token_count(&self) -> u64 {
        self.terms.values().map(|e| e.freq).sum()
    }

    /// Last valid token position in the document, if any token exists.
    pub fn last_position(&self) -> Option<u32> {
        self.terms
            .values()
            .filter_map(|e| e.positions.last().copied())
            .max()
    }

    /// Build a position -> term lookup covering every occurrence.
    pub fn position_terms(&self) -> AHashMap<u32, &str> {
        let mut map = AHashMap::new();
        for (term, entry) in self.terms.iter() {
            for &position in &entry.positions {
                map.insert(position, term.as_str());
            }
        }
        map
    }
}

/// A non-positional match: a document and the number of matching tokens in
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocHit {
    /// The matching document.
    pub doc: DocRef,
    /// Number of matching token occurrences within the document.
    pub freq: u64,
}

/// A positional match: one span of tokens within a document.
///
/// `end` is exclusive, so a single-token match at position `p` has
/// `start == p` and `end == p + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanHit {
    /// The matching document.
    pub doc: DocRef,
    /// First token position of the match.
    pub start: u32,
    /// One past the last token position of the match.
    pub end: u32,
}

/// A set of document references used to scope index operations.
///
/// Backed by a bitmap over the index's document-reference space; documents
/// outside the set are invisible to scoped evaluation.
#[derive(Debug, Clone)]
pub struct DocScope {
    bits: BitVec,
}

impl DocScope {
    /// Create a scope covering none of `doc_count` documents.
    pub fn with_capacity(doc_count: u64) -> Self {
        DocScope {
            bits: BitVec::from_elem(doc_count as usize, false),
        }
    }

    /// Add a document to the scope.
    pub fn insert(&mut self, doc: DocRef) {
        let idx = doc as usize;
        if idx >= self.bits.len() {
            self.bits.grow(idx + 1 - self.bits.len(), false);
        }
        self.bits.set(idx, true);
    }

    /// Check whether a document belongs to the scope.
    pub fn contains(&self, doc: DocRef) -> bool {
        self.bits.get(doc as usize).unwrap_or(false)
    }

    /// Number of documents in the scope.
    pub fn len(&self) -> usize {
        self.bits.iter().filter(|b| *b).count()
    }

    /// Whether the scope is empty.
    pub fn is_empty(&self) -> bool {
        !self.bits.any()
    }
}

/// Read-only capabilities the analytics engines require from an index
/// backend.
///
/// Implementations must be usable from multiple threads; all methods take
/// `&self`.
pub trait IndexReader: Send + Sync + Debug {
    /// Total number of documents in the physical index (across all
    /// corpora).
    fn doc_count(&self) -> u64;

    /// Resolve an external document id to an index-internal reference.
    fn doc_ref(&self, external_id: &str) -> Option<DocRef>;

    /// Read a document's term vector for the given token type.
    ///
    /// Returns `None` when the document has no tokens of that type.
    fn term_vector(&self, doc: DocRef, token_type: TokenType) -> Result<Option<TermVector>>;

    /// Enumerate the distinct terms of a token type across the scoped
    /// documents, in unspecified order.
    fn enumerate_terms(&self, token_type: TokenType, scope: &DocScope) -> Result<Vec<String>>;

    /// Evaluate a query without positions, yielding matching documents and
    /// per-document match frequencies. Only documents in `scope` are
    /// yielded, in index-internal order.
    fn evaluate(&self, query: &Query, token_type: TokenType, scope: &DocScope)
    -> Result<Vec<DocHit>>;

    /// Evaluate a query positionally, yielding one hit per matching span.
    /// Only documents in `scope` are yielded; hits are ordered by document
    /// (index-internal order) then by start position.
    fn evaluate_spans(
        &self,
        query: &Query,
        token_type: TokenType,
        scope: &DocScope,
    ) -> Result<Vec<SpanHit>>;

    /// Total token count of one document for the given token type.
    fn document_token_count(&self, doc: DocRef, token_type: TokenType) -> Result<u64> {
        Ok(self
            .term_vector(doc, token_type)?
            .map(|tv| tv.token_count())
            .unwrap_or(0))
    }

    /// A number that changes whenever the index content changes; part of
    /// the aggregate-cache key.
    fn index_version(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_term_vector_from_tokens() {
        let tv = TermVector::from_tokens(&tokens(&["a", "b", "a", "c", "a"]));
        assert_eq!(tv.distinct_terms(), 3);
        assert_eq!(tv.token_count(), 5);
        assert_eq!(tv.last_position(), Some(4));
        let a = tv.get("a").unwrap();
        assert_eq!(a.freq, 3);
        assert_eq!(a.positions, vec![0, 2, 4]);
    }

    #[test]
    fn test_term_vector_position_terms() {
        let tv = TermVector::from_tokens(&tokens(&["x", "y", "x"]));
        let by_position = tv.position_terms();
        assert_eq!(by_position[&0], "x");
        assert_eq!(by_position[&1], "y");
        assert_eq!(by_position[&2], "x");
    }

    #[test]
    fn test_empty_term_vector() {
        let tv = TermVector::from_tokens(&[]);
        assert_eq!(tv.token_count(), 0);
        assert_eq!(tv.last_position(), None);
    }

    #[test]
    fn test_doc_scope_membership() {
        let mut scope = DocScope::with_capacity(4);
        scope.insert(1);
        scope.insert(3);
        assert!(scope.contains(1));
        assert!(scope.contains(3));
        assert!(!scope.contains(0));
        assert!(!scope.contains(99));
        assert_eq!(scope.len(), 2);
    }

    #[test]
    fn test_doc_scope_grows_on_demand() {
        let mut scope = DocScope::with_capacity(1);
        scope.insert(10);
        assert!(scope.contains(10));
    }
}
