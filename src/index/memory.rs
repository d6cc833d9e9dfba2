//! In-memory reference implementation of the index capability contract.
//!
//! `MemoryIndex` keeps per-document term vectors (with positions) for every
//! token type and evaluates the query shapes of
//! [`Query`](crate::index::query::Query) directly against them. It is the
//! backend the test suite and small in-process analysis sessions run
//! against; large deployments implement [`IndexReader`] over their own
//! inverted index.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

use crate::analysis::tokenize;
use crate::corpus::TokenType;
use crate::error::{ConcordError, Result};
use crate::index::query::Query;
use crate::index::{DocHit, DocRef, DocScope, IndexReader, SpanHit, TermVector};

#[derive(Debug)]
struct StoredDoc {
    external_id: String,
    lexical: TermVector,
    all: TermVector,
}

impl StoredDoc {
    fn vector(&self, token_type: TokenType) -> &TermVector {
        match token_type {
            TokenType::Lexical => &self.lexical,
            TokenType::All => &self.all,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<StoredDoc>,
    by_external_id: AHashMap<String, DocRef>,
    version: u64,
}

/// An in-memory index of tokenized documents.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    inner: RwLock<Inner>,
}

impl MemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        MemoryIndex::default()
    }

    /// Tokenize and add a document, returning its index-internal reference.
    ///
    /// External ids must be unique within the index.
    pub fn add_document(&self, external_id: &str, text: &str) -> Result<DocRef> {
        let mut inner = self.inner.write();
        if inner.by_external_id.contains_key(external_id) {
            return Err(ConcordError::invalid_argument(format!(
                "document '{external_id}' already indexed"
            )));
        }
        let doc = inner.docs.len() as DocRef;
        inner.docs.push(StoredDoc {
            external_id: external_id.to_string(),
            lexical: TermVector::from_tokens(&tokenize(text, TokenType::Lexical)),
            all: TermVector::from_tokens(&tokenize(text, TokenType::All)),
        });
        inner.by_external_id.insert(external_id.to_string(), doc);
        inner.version += 1;
        Ok(doc)
    }

    /// The external id of a document reference.
    pub fn external_id(&self, doc: DocRef) -> Option<String> {
        self.inner
            .read()
            .docs
            .get(doc as usize)
            .map(|d| d.external_id.clone())
    }

    /// Spans of one query within one term vector, ordered by start.
    fn spans_in_vector(query: &Query, vector: &TermVector) -> Result<Vec<(u32, u32)>> {
        match query {
            Query::Term(term) => Ok(vector
                .get(term)
                .map(|e| e.positions.iter().map(|&p| (p, p + 1)).collect())
                .unwrap_or_default()),
            Query::Wildcard(pattern) => {
                let re = Query::wildcard_regex(pattern)?;
                let mut spans: Vec<(u32, u32)> = vector
                    .iter()
                    .filter(|(term, _)| re.is_match(term))
                    .flat_map(|(_, e)| e.positions.iter().map(|&p| (p, p + 1)))
                    .collect();
                spans.sort_unstable();
                Ok(spans)
            }
            Query::Phrase(words) => {
                let entries: Option<Vec<_>> = words.iter().map(|w| vector.get(w)).collect();
                let Some(entries) = entries else {
                    return Ok(Vec::new());
                };
                let mut spans = Vec::new();
                for &start in &entries[0].positions {
                    let consecutive = entries[1..].iter().enumerate().all(|(offset, entry)| {
                        entry
                            .positions
                            .binary_search(&(start + offset as u32 + 1))
                            .is_ok()
                    });
                    if consecutive {
                        spans.push((start, start + words.len() as u32));
                    }
                }
                Ok(spans)
            }
            Query::Or(alternatives) => {
                let mut spans = Vec::new();
                for alternative in alternatives {
                    spans.extend(Self::spans_in_vector(alternative, vector)?);
                }
                spans.sort_unstable();
                spans.dedup();
                Ok(spans)
            }
        }
    }

    /// Number of matching token occurrences of one query in one vector.
    fn freq_in_vector(query: &Query, vector: &TermVector) -> Result<u64> {
        match query {
            Query::Term(term) => Ok(vector.get(term).map(|e| e.freq).unwrap_or(0)),
            Query::Wildcard(pattern) => {
                let re = Query::wildcard_regex(pattern)?;
                Ok(vector
                    .iter()
                    .filter(|(term, _)| re.is_match(term))
                    .map(|(_, e)| e.freq)
                    .sum())
            }
            // Positional and compound shapes fall back to span counting so
            // frequency always agrees with the positional view.
            Query::Phrase(_) | Query::Or(_) => {
                Ok(Self::spans_in_vector(query, vector)?.len() as u64)
            }
        }
    }
}

impl IndexReader for MemoryIndex {
    fn doc_count(&self) -> u64 {
        self.inner.read().docs.len() as u64
    }

    fn doc_ref(&self, external_id: &str) -> Option<DocRef> {
        self.inner.read().by_external_id.get(external_id).copied()
    }

    fn term_vector(&self, doc: DocRef, token_type: TokenType) -> Result<Option<TermVector>> {
        let inner = self.inner.read();
        let stored = inner
            .docs
            .get(doc as usize)
            .ok_or_else(|| ConcordError::index(format!("unknown document reference {doc}")))?;
        let vector = stored.vector(token_type);
        if vector.distinct_terms() == 0 {
            Ok(None)
        } else {
            Ok(Some(vector.clone()))
        }
    }

    fn enumerate_terms(&self, token_type: TokenType, scope: &DocScope) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let mut terms: AHashSet<String> = AHashSet::new();
        for (doc, stored) in inner.docs.iter().enumerate() {
            if !scope.contains(doc as DocRef) {
                continue;
            }
            for (term, _) in stored.vector(token_type).iter() {
                terms.insert(term.to_string());
            }
        }
        Ok(terms.into_iter().collect())
    }

    fn evaluate(
        &self,
        query: &Query,
        token_type: TokenType,
        scope: &DocScope,
    ) -> Result<Vec<DocHit>> {
        let inner = self.inner.read();
        let mut hits = Vec::new();
        for (doc, stored) in inner.docs.iter().enumerate() {
            let doc = doc as DocRef;
            if !scope.contains(doc) {
                continue;
            }
            let freq = Self::freq_in_vector(query, stored.vector(token_type))?;
            if freq > 0 {
                hits.push(DocHit { doc, freq });
            }
        }
        Ok(hits)
    }

    fn evaluate_spans(
        &self,
        query: &Query,
        token_type: TokenType,
        scope: &DocScope,
    ) -> Result<Vec<SpanHit>> {
        let inner = self.inner.read();
        let mut hits = Vec::new();
        for (doc, stored) in inner.docs.iter().enumerate() {
            let doc = doc as DocRef;
            if !scope.contains(doc) {
                continue;
            }
            for (start, end) in Self::spans_in_vector(query, stored.vector(token_type))? {
                hits.push(SpanHit { doc, start, end });
            }
        }
        Ok(hits)
    }

    fn index_version(&self) -> u64 {
        self.inner.read().version
    }
}
