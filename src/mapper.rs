//! Mapping between corpus positions and index document references.
//!
//! The physical index may hold documents from many corpora. `CorpusMapper`
//! resolves one corpus's documents to index references, answers the reverse
//! lookup, and scopes every query or span evaluation so results can never
//! include documents outside the corpus.

use std::sync::Arc;

use ahash::AHashMap;

use crate::corpus::{Corpus, TokenType};
use crate::error::{ConcordError, Result};
use crate::index::query::Query;
use crate::index::{DocHit, DocRef, DocScope, IndexReader, SpanHit, TermVector};

/// Scoped, bidirectional document mapping for one corpus.
pub struct CorpusMapper<'a> {
    index: Arc<dyn IndexReader>,
    corpus: &'a Corpus,
    doc_refs: Vec<DocRef>,
    positions: AHashMap<DocRef, usize>,
    scope: DocScope,
}

impl<'a> CorpusMapper<'a> {
    /// Resolve every corpus document against the index.
    ///
    /// Fails with `NotFound` if any corpus document is missing from the
    /// index; a corpus must never be mapped against an index that does not
    /// contain all of it.
    pub fn new(index: Arc<dyn IndexReader>, corpus: &'a Corpus) -> Result<Self> {
        let mut doc_refs = Vec::with_capacity(corpus.size());
        let mut positions = AHashMap::with_capacity(corpus.size());
        let mut scope = DocScope::with_capacity(index.doc_count());
        for (position, id) in corpus.document_ids().iter().enumerate() {
            let doc = index.doc_ref(id).ok_or_else(|| {
                ConcordError::not_found(format!(
                    "document '{id}' of corpus '{}' is not in the index",
                    corpus.id()
                ))
            })?;
            doc_refs.push(doc);
            positions.insert(doc, position);
            scope.insert(doc);
        }
        Ok(CorpusMapper {
            index,
            corpus,
            doc_refs,
            positions,
            scope,
        })
    }

    /// The mapped corpus.
    pub fn corpus(&self) -> &Corpus {
        self.corpus
    }

    /// The underlying index reader.
    pub fn index(&self) -> &Arc<dyn IndexReader> {
        &self.index
    }

    /// Corpus position of an index document reference.
    ///
    /// A miss means a scoping defect somewhere upstream; it is reported as
    /// the fatal `NotInCorpus` error, never silently skipped.
    pub fn position_of(&self, doc: DocRef) -> Result<usize> {
        self.positions
            .get(&doc)
            .copied()
            .ok_or_else(|| ConcordError::not_in_corpus(doc, self.corpus.id()))
    }

    /// Index references of all corpus documents, in corpus-position order.
    ///
    /// This is the deterministic iteration basis for every full scan.
    pub fn doc_refs(&self) -> &[DocRef] {
        &self.doc_refs
    }

    /// The corpus membership scope handed to the index.
    pub fn doc_scope(&self) -> &DocScope {
        &self.scope
    }

    /// Read one corpus document's term vector.
    pub fn term_vector(&self, doc: DocRef, token_type: TokenType) -> Result<Option<TermVector>> {
        self.index.term_vector(doc, token_type)
    }

    /// Evaluate a query without positions, restricted to the corpus.
    pub fn filtered_query(&self, query: &Query, token_type: TokenType) -> Result<Vec<DocHit>> {
        self.index.evaluate(query, token_type, &self.scope)
    }

    /// Evaluate a query positionally, restricted to the corpus.
    ///
    /// Hits come back in index-internal order, not corpus order; callers
    /// must re-map through [`position_of`](Self::position_of) before
    /// touching any corpus-position-indexed array.
    pub fn filtered_spans(&self, query: &Query, token_type: TokenType) -> Result<Vec<SpanHit>> {
        self.index.evaluate_spans(query, token_type, &self.scope)
    }
}

impl std::fmt::Debug for CorpusMapper<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusMapper")
            .field("corpus", &self.corpus.id())
            .field("documents", &self.doc_refs.len())
            .finish()
    }
}
