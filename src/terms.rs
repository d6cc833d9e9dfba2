//! Corpus term statistics.
//!
//! Computes ranked term-frequency results for a corpus, either over all
//! distinct terms or for caller-supplied queries. The request is
//! classified once, before any index I/O, into the cheapest sufficient
//! strategy; per-document distributions and their shape statistics are
//! only produced when the request (or its sort key) actually needs them.

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::aggregate::TermAggregates;
use crate::corpus::TokenType;
use crate::corpus::stopwords::StopwordSet;
use crate::error::Result;
use crate::index::TermVector;
use crate::index::query::Query;
use crate::mapper::CorpusMapper;
use crate::ranker::BoundedRanker;
use crate::stats;
use crate::storage::Storage;

/// Which per-document distribution a caller wants rendered.
///
/// The engine always computes what the sort key requires; this mode only
/// controls which distribution arrays are attached to the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionsMode {
    /// No distribution arrays.
    #[default]
    None,
    /// Per-bin raw frequencies.
    Raw,
    /// Per-bin relative frequencies.
    Relative,
}

/// Sort orders for term results.
///
/// Every order breaks ties by term text ascending, so equal primary keys
/// still produce a reproducible ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TermSort {
    /// Raw frequency, most frequent first.
    #[default]
    RawFrequencyDesc,
    /// Raw frequency, least frequent first.
    RawFrequencyAsc,
    /// Relative frequency, highest first.
    RelativeFrequencyDesc,
    /// Relative frequency, lowest first.
    RelativeFrequencyAsc,
    /// Document count, highest first.
    InDocumentsCountDesc,
    /// Document count, lowest first.
    InDocumentsCountAsc,
    /// Term text, A first.
    TermAsc,
    /// Term text, Z first.
    TermDesc,
    /// Distribution skewness, highest first.
    SkewnessDesc,
    /// Distribution skewness, lowest first.
    SkewnessAsc,
    /// Distribution peakedness, highest first.
    PeakednessDesc,
    /// Distribution peakedness, lowest first.
    PeakednessAsc,
}

impl TermSort {
    /// Whether ranking on this key requires per-document distributions.
    pub fn needs_distributions(&self) -> bool {
        matches!(
            self,
            TermSort::SkewnessDesc
                | TermSort::SkewnessAsc
                | TermSort::PeakednessDesc
                | TermSort::PeakednessAsc
        )
    }

    pub(crate) fn comparator(
        &self,
    ) -> impl Fn(&TermResult, &TermResult) -> Ordering + Send + Sync + 'static {
        let sort = *self;
        move |a, b| {
            let primary = match sort {
                TermSort::RawFrequencyDesc => b.raw_freq.cmp(&a.raw_freq),
                TermSort::RawFrequencyAsc => a.raw_freq.cmp(&b.raw_freq),
                TermSort::RelativeFrequencyDesc => b.relative_freq.total_cmp(&a.relative_freq),
                TermSort::RelativeFrequencyAsc => a.relative_freq.total_cmp(&b.relative_freq),
                TermSort::InDocumentsCountDesc => b.in_documents_count.cmp(&a.in_documents_count),
                TermSort::InDocumentsCountAsc => a.in_documents_count.cmp(&b.in_documents_count),
                TermSort::TermAsc => a.term.cmp(&b.term),
                TermSort::TermDesc => b.term.cmp(&a.term),
                TermSort::SkewnessDesc => b.skewness.total_cmp(&a.skewness),
                TermSort::SkewnessAsc => a.skewness.total_cmp(&b.skewness),
                TermSort::PeakednessDesc => b.peakedness.total_cmp(&a.peakedness),
                TermSort::PeakednessAsc => a.peakedness.total_cmp(&b.peakedness),
            };
            primary.then_with(|| a.term.cmp(&b.term))
        }
    }
}

/// One ranked term row.
#[derive(Debug, Clone, Serialize)]
pub struct TermResult {
    /// The term text (or the query string that produced the row).
    pub term: String,
    /// Total occurrences across the corpus.
    pub raw_freq: u64,
    /// `raw_freq` over the corpus's total token count.
    pub relative_freq: f64,
    /// Number of documents with at least one occurrence.
    pub in_documents_count: u64,
    /// Per-bin raw frequencies, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_distributions: Option<Vec<u64>>,
    /// Per-bin relative frequencies, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative_distributions: Option<Vec<f64>>,
    /// Sample skewness of the binned relative distribution; 0.0 when no
    /// distribution was computed.
    pub skewness: f64,
    /// Sample excess kurtosis of the binned relative distribution; 0.0
    /// when no distribution was computed.
    pub peakedness: f64,
}

impl TermResult {
    fn without_distributions(
        term: String,
        raw_freq: u64,
        in_documents_count: u64,
        total_tokens: u64,
    ) -> Self {
        TermResult {
            term,
            raw_freq,
            relative_freq: relative(raw_freq, total_tokens),
            in_documents_count,
            raw_distributions: None,
            relative_distributions: None,
            skewness: 0.0,
            peakedness: 0.0,
        }
    }

    /// Build a row from a corpus-position-indexed raw frequency array.
    ///
    /// The raw array must be corpus-sized (zero-filled for documents
    /// without the term); its sum is the term's aggregate raw frequency.
    fn with_distributions(
        term: String,
        document_raw_freqs: Vec<u64>,
        document_token_counts: &[u64],
        total_tokens: u64,
        bins: usize,
        mode: DistributionsMode,
    ) -> Self {
        let raw_freq: u64 = document_raw_freqs.iter().sum();
        let in_documents_count = document_raw_freqs.iter().filter(|&&f| f > 0).count() as u64;
        let document_relative_freqs: Vec<f64> = document_raw_freqs
            .iter()
            .zip(document_token_counts)
            .map(|(&freq, &tokens)| relative(freq, tokens))
            .collect();

        let binned_raw = stats::bin(&document_raw_freqs, bins);
        let binned_relative = stats::bin(&document_relative_freqs, bins);
        let skewness = stats::skewness(&binned_relative);
        let peakedness = stats::peakedness(&binned_relative);

        TermResult {
            term,
            raw_freq,
            relative_freq: relative(raw_freq, total_tokens),
            in_documents_count,
            raw_distributions: (mode == DistributionsMode::Raw).then_some(binned_raw),
            relative_distributions: (mode == DistributionsMode::Relative)
                .then_some(binned_relative),
            skewness,
            peakedness,
        }
    }
}

fn relative(raw: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        raw as f64 / total as f64
    }
}

/// Parameters of one term-statistics request.
#[derive(Debug, Clone, Default)]
pub struct CorpusTermsRequest {
    /// Query strings; empty means all distinct terms.
    pub queries: Vec<String>,
    /// Token type the statistics are drawn from.
    pub token_type: TokenType,
    /// Terms excluded from all-terms enumeration. Queried terms are never
    /// filtered; asking about a stopword is a deliberate act.
    pub stopwords: StopwordSet,
    /// Number of leading ranked rows to skip.
    pub start: usize,
    /// Maximum number of rows to return.
    pub limit: usize,
    /// Distribution bin count; defaults to the corpus size (unbinned).
    pub bins: Option<usize>,
    /// Ranking order.
    pub sort: TermSort,
    /// Which distribution arrays to attach.
    pub distributions: DistributionsMode,
    /// Skip all positional work; only match counts per document are
    /// needed.
    pub counts_only: bool,
}

impl CorpusTermsRequest {
    /// A request for all distinct terms, most frequent first.
    pub fn new(token_type: TokenType) -> Self {
        CorpusTermsRequest {
            token_type,
            limit: usize::MAX,
            ..Default::default()
        }
    }

    /// Set the query strings.
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

    /// Set pagination.
    pub fn with_paging(mut self, start: usize, limit: usize) -> Self {
        self.start = start;
        self.limit = limit;
        self
    }

    /// Set the distribution bin count.
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    /// Set the ranking order.
    pub fn with_sort(mut self, sort: TermSort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the distribution mode.
    pub fn with_distributions(mut self, mode: DistributionsMode) -> Self {
        self.distributions = mode;
        self
    }

    /// Only count matches per document; never touch positions.
    pub fn counts_only(mut self) -> Self {
        self.counts_only = true;
        self
    }
}

/// Request-shape classification, fixed before any index I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// All distinct terms from the aggregate cache; no positional work.
    CachedAllTerms,
    /// All distinct terms with per-document distributions, by full
    /// term-vector scan.
    ScannedAllTerms,
    /// Caller-supplied queries, each routed to its own cheapest path.
    Queries,
}

/// The corpus term-statistics engine.
pub struct CorpusTerms {
    request: CorpusTermsRequest,
}

impl CorpusTerms {
    /// Create an engine for one request.
    pub fn new(request: CorpusTermsRequest) -> Self {
        CorpusTerms { request }
    }

    fn needs_distributions(&self) -> bool {
        !self.request.counts_only
            && (self.request.distributions != DistributionsMode::None
                || self.request.sort.needs_distributions())
    }

    fn strategy(&self) -> Strategy {
        if !self.request.queries.is_empty() {
            Strategy::Queries
        } else if self.needs_distributions() {
            Strategy::ScannedAllTerms
        } else {
            Strategy::CachedAllTerms
        }
    }

    fn bins(&self, corpus_size: usize) -> usize {
        self.request.bins.unwrap_or(corpus_size)
    }

    /// Run the request and return the ranked rows `[start, start+limit)`.
    pub fn execute(
        &self,
        mapper: &CorpusMapper<'_>,
        storage: &Arc<dyn Storage>,
    ) -> Result<Vec<TermResult>> {
        let capacity = self.request.start.saturating_add(self.request.limit);
        let mut ranker = BoundedRanker::new(capacity, self.request.sort.comparator());
        let strategy = self.strategy();
        debug!(
            "corpus terms on '{}': {:?}, {} queries",
            mapper.corpus().id(),
            strategy,
            self.request.queries.len()
        );
        match strategy {
            Strategy::CachedAllTerms => self.run_all_terms_cached(mapper, storage, &mut ranker)?,
            Strategy::ScannedAllTerms => self.run_all_terms_scanned(mapper, &mut ranker)?,
            Strategy::Queries => self.run_queries(mapper, storage, &mut ranker)?,
        }
        Ok(ranker.into_ordered_list(self.request.start))
    }

    /// All terms, no distributions: one pass over the aggregate table.
    fn run_all_terms_cached(
        &self,
        mapper: &CorpusMapper<'_>,
        storage: &Arc<dyn Storage>,
        ranker: &mut BoundedRanker<TermResult>,
    ) -> Result<()> {
        let total_tokens = mapper.corpus().tokens_count(self.request.token_type);
        let aggregates = TermAggregates::open(mapper, self.request.token_type, storage)?;
        for record in aggregates.values() {
            if self.request.stopwords.is_stopword(&record.term) {
                continue;
            }
            ranker.offer(TermResult::without_distributions(
                record.term.clone(),
                record.raw_freq,
                record.documents_count,
                total_tokens,
            ));
        }
        aggregates.close();
        Ok(())
    }

    /// All terms with distributions: full positional term-vector scan.
    ///
    /// O(total (document, term) occurrences); only reached when the
    /// request shape actually requires per-document arrays.
    fn run_all_terms_scanned(
        &self,
        mapper: &CorpusMapper<'_>,
        ranker: &mut BoundedRanker<TermResult>,
    ) -> Result<()> {
        let corpus = mapper.corpus();
        let token_type = self.request.token_type;
        let document_token_counts = corpus.document_token_counts(token_type);
        let total_tokens = corpus.tokens_count(token_type);
        let bins = self.bins(corpus.size());

        // Vector reads are independent per document; the merge below runs
        // in corpus order so array layout never depends on thread timing.
        let vectors: Vec<Option<TermVector>> = mapper
            .doc_refs()
            .par_iter()
            .map(|&doc| mapper.term_vector(doc, token_type))
            .collect::<Result<Vec<_>>>()?;

        let mut per_term: AHashMap<String, Vec<(usize, u64)>> = AHashMap::new();
        for (position, vector) in vectors.iter().enumerate() {
            let Some(vector) = vector else { continue };
            for (term, entry) in vector.iter() {
                if self.request.stopwords.is_stopword(term) {
                    continue;
                }
                per_term
                    .entry(term.to_string())
                    .or_default()
                    .push((position, entry.freq));
            }
        }

        for (term, doc_freqs) in per_term {
            let mut raw = vec![0u64; corpus.size()];
            for (position, freq) in doc_freqs {
                raw[position] = freq;
            }
            ranker.offer(TermResult::with_distributions(
                term,
                raw,
                document_token_counts,
                total_tokens,
                bins,
                self.request.distributions,
            ));
        }
        Ok(())
    }

    /// Caller-supplied queries, each routed to the cheapest sufficient
    /// path. A query with zero matches still produces its zero row.
    fn run_queries(
        &self,
        mapper: &CorpusMapper<'_>,
        storage: &Arc<dyn Storage>,
        ranker: &mut BoundedRanker<TermResult>,
    ) -> Result<()> {
        let token_type = self.request.token_type;
        let total_tokens = mapper.corpus().tokens_count(token_type);
        let needs_distributions = self.needs_distributions();

        // Classify every query before any index I/O: a bare term without
        // distributions is a cache lookup, other non-distribution shapes
        // run through the counting collector, and everything needing
        // distributions goes through span evaluation.
        let mut lookups: Vec<(String, String)> = Vec::new();
        let mut collected: Vec<(String, Query)> = Vec::new();
        let mut spanned: Vec<(String, Query)> = Vec::new();
        for query_string in &self.request.queries {
            let query = Query::parse(query_string)?;
            if needs_distributions {
                spanned.push((query_string.clone(), query));
            } else if let Some(term) = query.as_single_term() {
                lookups.push((query_string.clone(), term.to_string()));
            } else {
                collected.push((query_string.clone(), query));
            }
        }

        if !lookups.is_empty() {
            let aggregates = TermAggregates::open(mapper, token_type, storage)?;
            for (query_string, term) in lookups {
                let (raw_freq, in_documents_count) = aggregates
                    .get(&term)
                    .map(|record| (record.raw_freq, record.documents_count))
                    .unwrap_or((0, 0));
                ranker.offer(TermResult::without_distributions(
                    query_string,
                    raw_freq,
                    in_documents_count,
                    total_tokens,
                ));
            }
            aggregates.close();
        }

        for (query_string, query) in collected {
            let hits = mapper.filtered_query(&query, token_type)?;
            let raw_freq = hits.iter().map(|h| h.freq).sum();
            ranker.offer(TermResult::without_distributions(
                query_string,
                raw_freq,
                hits.len() as u64,
                total_tokens,
            ));
        }

        for (query_string, query) in spanned {
            self.offer_from_spans(mapper, ranker, query_string, &query)?;
        }
        Ok(())
    }

    /// Span evaluation with per-document tallies, for queries that need
    /// distributions.
    fn offer_from_spans(
        &self,
        mapper: &CorpusMapper<'_>,
        ranker: &mut BoundedRanker<TermResult>,
        query_string: String,
        query: &Query,
    ) -> Result<()> {
        let corpus = mapper.corpus();
        let token_type = self.request.token_type;

        let mut raw = vec![0u64; corpus.size()];
        for hit in mapper.filtered_spans(query, token_type)? {
            // Hits arrive in index order; the corpus position decides the
            // array slot.
            raw[mapper.position_of(hit.doc)?] += 1;
        }
        ranker.offer(TermResult::with_distributions(
            query_string,
            raw,
            corpus.document_token_counts(token_type),
            corpus.tokens_count(token_type),
            self.bins(corpus.size()),
            self.request.distributions,
        ));
        Ok(())
    }
}
