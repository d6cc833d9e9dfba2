//! Collocate statistics: terms co-occurring near keyword matches.
//!
//! For every query ("keyword") and every document containing a match, the
//! engine scans a token window of `context` positions on each side of each
//! match, tallies the non-stopword terms it finds, and emits one
//! [`Collocate`] per (document, keyword, context term). Tallies accumulate
//! across all of a keyword's matches in a document before any ratio is
//! computed, so a term sitting next to two matches is one record with a
//! count of two, never two records.

use std::cmp::Ordering;

use ahash::AHashMap;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::corpus::TokenType;
use crate::corpus::stopwords::StopwordSet;
use crate::error::{ConcordError, Result};
use crate::index::DocRef;
use crate::index::query::Query;
use crate::mapper::CorpusMapper;
use crate::ranker::BoundedRanker;

/// One collocation fact.
#[derive(Debug, Clone, Serialize)]
pub struct Collocate {
    /// Corpus position of the document.
    pub document_position: usize,
    /// The query string whose matches anchor the context windows.
    pub keyword: String,
    /// The co-occurring term.
    pub term: String,
    /// Occurrences of the term inside the keyword's context windows.
    pub context_raw_freq: u64,
    /// `context_raw_freq` over all context tokens tallied for the keyword
    /// in this document.
    pub context_relative_freq: f64,
    /// Occurrences of the term in the whole document.
    pub document_raw_freq: u64,
    /// `document_raw_freq` over the document's token count.
    pub document_relative_freq: f64,
}

/// Sort orders for collocate results.
///
/// Ties are broken by term, keyword, then document position, all
/// ascending, so rankings are reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollocateSort {
    /// Context frequency, highest first.
    #[default]
    ContextRawFreqDesc,
    /// Context frequency, lowest first.
    ContextRawFreqAsc,
    /// Relative context frequency, highest first.
    ContextRelativeFreqDesc,
    /// Relative context frequency, lowest first.
    ContextRelativeFreqAsc,
    /// Whole-document frequency, highest first.
    DocumentRawFreqDesc,
    /// Whole-document frequency, lowest first.
    DocumentRawFreqAsc,
    /// Relative document frequency, highest first.
    DocumentRelativeFreqDesc,
    /// Relative document frequency, lowest first.
    DocumentRelativeFreqAsc,
    /// Term text, A first.
    TermAsc,
    /// Term text, Z first.
    TermDesc,
}

impl CollocateSort {
    pub(crate) fn comparator(
        &self,
    ) -> impl Fn(&Collocate, &Collocate) -> Ordering + Send + Sync + 'static {
        let sort = *self;
        move |a, b| {
            let primary = match sort {
                CollocateSort::ContextRawFreqDesc => b.context_raw_freq.cmp(&a.context_raw_freq),
                CollocateSort::ContextRawFreqAsc => a.context_raw_freq.cmp(&b.context_raw_freq),
                CollocateSort::ContextRelativeFreqDesc => {
                    b.context_relative_freq.total_cmp(&a.context_relative_freq)
                }
                CollocateSort::ContextRelativeFreqAsc => {
                    a.context_relative_freq.total_cmp(&b.context_relative_freq)
                }
                CollocateSort::DocumentRawFreqDesc => {
                    b.document_raw_freq.cmp(&a.document_raw_freq)
                }
                CollocateSort::DocumentRawFreqAsc => {
                    a.document_raw_freq.cmp(&b.document_raw_freq)
                }
                CollocateSort::DocumentRelativeFreqDesc => b
                    .document_relative_freq
                    .total_cmp(&a.document_relative_freq),
                CollocateSort::DocumentRelativeFreqAsc => a
                    .document_relative_freq
                    .total_cmp(&b.document_relative_freq),
                CollocateSort::TermAsc => a.term.cmp(&b.term),
                CollocateSort::TermDesc => b.term.cmp(&a.term),
            };
            primary
                .then_with(|| a.term.cmp(&b.term))
                .then_with(|| a.keyword.cmp(&b.keyword))
                .then_with(|| a.document_position.cmp(&b.document_position))
        }
    }
}

/// Parameters of one collocates request.
#[derive(Debug, Clone)]
pub struct CollocatesRequest {
    /// Keyword query strings; at least one is required.
    pub queries: Vec<String>,
    /// Token type the windows and counts are drawn from.
    pub token_type: TokenType,
    /// Terms skipped inside context windows.
    pub stopwords: StopwordSet,
    /// Window radius in tokens on each side of a match.
    pub context: usize,
    /// Maximum number of results, applied per document and again after the
    /// corpus-wide merge.
    pub limit: usize,
    /// Ranking order.
    pub sort: CollocateSort,
}

impl CollocatesRequest {
    /// A request with the default window radius of 5 tokens.
    pub fn new(token_type: TokenType) -> Self {
        CollocatesRequest {
            queries: Vec::new(),
            token_type,
            stopwords: StopwordSet::empty(),
            context: 5,
            limit: usize::MAX,
            sort: CollocateSort::default(),
        }
    }

    /// Set the keyword queries.
    pub fn with_queries<I, S>(mut self, queries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queries = queries.into_iter().map(Into::into).collect();
        self
    }

    /// Set the stopword set.
    pub fn with_stopwords(mut self, stopwords: StopwordSet) -> Self {
        self.stopwords = stopwords;
        self
    }

    /// Set the window radius.
    pub fn with_context(mut self, context: usize) -> Self {
        self.context = context;
        self
    }

    /// Set the result limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the ranking order.
    pub fn with_sort(mut self, sort: CollocateSort) -> Self {
        self.sort = sort;
        self
    }
}

/// The collocation engine.
pub struct Collocates {
    request: CollocatesRequest,
}

impl Collocates {
    /// Create an engine for one request.
    pub fn new(request: CollocatesRequest) -> Self {
        Collocates { request }
    }

    /// Run the request and return the ranked collocates.
    ///
    /// Each document's candidates are first ranked into a limit-capacity
    /// ranker, then merged into one corpus-wide ranker of the same
    /// capacity and re-trimmed. When a document holds more candidates than
    /// the limit, a locally evicted candidate can in principle belong to
    /// the exact global ranking; the per-document trim is kept as the
    /// established behavior of this computation.
    pub fn execute(&self, mapper: &CorpusMapper<'_>) -> Result<Vec<Collocate>> {
        if self.request.queries.is_empty() {
            return Err(ConcordError::invalid_argument(
                "collocates require at least one query",
            ));
        }

        // Evaluate every keyword's spans and group them per document.
        let mut spans_by_doc: AHashMap<DocRef, AHashMap<usize, Vec<(u32, u32)>>> = AHashMap::new();
        for (query_index, query_string) in self.request.queries.iter().enumerate() {
            let query = Query::parse(query_string)?;
            for hit in mapper.filtered_spans(&query, self.request.token_type)? {
                spans_by_doc
                    .entry(hit.doc)
                    .or_default()
                    .entry(query_index)
                    .or_default()
                    .push((hit.start, hit.end));
            }
        }

        // Documents are processed in corpus order so the merge below is
        // deterministic.
        let mut docs: Vec<(usize, DocRef, AHashMap<usize, Vec<(u32, u32)>>)> = Vec::new();
        for (doc, spans) in spans_by_doc {
            docs.push((mapper.position_of(doc)?, doc, spans));
        }
        docs.sort_by_key(|(position, _, _)| *position);
        debug!(
            "collocates on '{}': {} keywords, {} matching documents",
            mapper.corpus().id(),
            self.request.queries.len(),
            docs.len()
        );

        let per_document: Vec<Vec<Collocate>> = docs
            .par_iter()
            .map(|(position, doc, spans)| self.document_collocates(mapper, *position, *doc, spans))
            .collect::<Result<Vec<_>>>()?;

        let mut merged = BoundedRanker::new(self.request.limit, self.request.sort.comparator());
        for collocates in per_document {
            for collocate in collocates {
                merged.offer(collocate);
            }
        }
        Ok(merged.into_ordered_list(0))
    }

    /// Collocates of one document, trimmed to the request limit.
    fn document_collocates(
        &self,
        mapper: &CorpusMapper<'_>,
        document_position: usize,
        doc: DocRef,
        spans_by_query: &AHashMap<usize, Vec<(u32, u32)>>,
    ) -> Result<Vec<Collocate>> {
        let token_type = self.request.token_type;
        let Some(vector) = mapper.term_vector(doc, token_type)? else {
            return Ok(Vec::new());
        };
        let terms_at = vector.position_terms();
        let last_token = mapper
            .corpus()
            .last_token_positions(token_type)
            .get(document_position)
            .copied()
            .unwrap_or_else(|| vector.last_position().unwrap_or(0));
        let document_total_tokens = vector.token_count();
        let context = self.request.context as u32;

        let mut ranker = BoundedRanker::new(self.request.limit, self.request.sort.comparator());
        for (&query_index, spans) in spans_by_query {
            let keyword = &self.request.queries[query_index];

            // First pass: accumulate context tallies across every match of
            // this keyword before any ratio is taken.
            let mut tallies: AHashMap<&str, u64> = AHashMap::new();
            for &(start, end) in spans {
                if context == 0 {
                    continue;
                }
                let left = start.saturating_sub(context);
                let right = (end + context - 1).min(last_token);
                for position in (left..start).chain(end..=right) {
                    let Some(&term) = terms_at.get(&position) else {
                        continue;
                    };
                    if self.request.stopwords.is_stopword(term) {
                        continue;
                    }
                    *tallies.entry(term).or_default() += 1;
                }
            }

            let context_total_tokens: u64 = tallies.values().sum();
            for (term, context_raw_freq) in tallies {
                let document_raw_freq = vector.get(term).map(|e| e.freq).unwrap_or(0);
                ranker.offer(Collocate {
                    document_position,
                    keyword: keyword.clone(),
                    term: term.to_string(),
                    context_raw_freq,
                    context_relative_freq: ratio(context_raw_freq, context_total_tokens),
                    document_raw_freq,
                    document_relative_freq: ratio(document_raw_freq, document_total_tokens),
                });
            }
        }
        Ok(ranker.into_unordered_list())
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collocate(term: &str, context_raw_freq: u64) -> Collocate {
        Collocate {
            document_position: 0,
            keyword: "k".into(),
            term: term.into(),
            context_raw_freq,
            context_relative_freq: 0.0,
            document_raw_freq: 0,
            document_relative_freq: 0.0,
        }
    }

    #[test]
    fn test_comparator_tie_break_is_term_ascending() {
        let cmp = CollocateSort::ContextRawFreqDesc.comparator();
        assert_eq!(cmp(&collocate("a", 2), &collocate("b", 2)), Ordering::Less);
        assert_eq!(
            cmp(&collocate("b", 3), &collocate("a", 2)),
            Ordering::Less
        );
    }

    #[test]
    fn test_missing_queries_rejected() {
        use crate::corpus::{Corpus, CorpusMetadata, corpus_id};
        use crate::index::memory::MemoryIndex;
        use std::sync::Arc;

        let index = MemoryIndex::new();
        index.add_document("d0", "some text").unwrap();
        let ids = vec!["d0".to_string()];
        let corpus = Corpus::from_metadata(CorpusMetadata::new(corpus_id(&ids), ids));
        let mapper = CorpusMapper::new(Arc::new(index), &corpus).unwrap();

        let engine = Collocates::new(CollocatesRequest::new(TokenType::Lexical));
        assert!(matches!(
            engine.execute(&mapper),
            Err(ConcordError::InvalidArgument(_))
        ));
    }
}
