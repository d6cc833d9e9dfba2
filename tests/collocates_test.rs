use std::sync::Arc;

use concord::collocates::{Collocate, CollocateSort, Collocates, CollocatesRequest};
use concord::corpus::TokenType;
use concord::corpus::builder::CorpusBuilder;
use concord::corpus::stopwords::StopwordSet;
use concord::index::IndexReader;
use concord::index::memory::MemoryIndex;
use concord::mapper::CorpusMapper;
use concord::storage::Storage;
use concord::storage::memory::{MemoryStorage, MemoryStorageConfig};
use concord::{ConcordError, Corpus};

fn build_corpus(
    docs: &[(&str, &str)],
) -> (Arc<dyn IndexReader>, Arc<dyn Storage>, Corpus) {
    let index = MemoryIndex::new();
    let mut ids = Vec::new();
    for (id, text) in docs {
        index.add_document(id, text).unwrap();
        ids.push(id.to_string());
    }
    let index: Arc<dyn IndexReader> = Arc::new(index);
    let storage: Arc<dyn Storage> =
        Arc::new(MemoryStorage::new(MemoryStorageConfig::default()));
    let corpus = CorpusBuilder::new(storage.clone())
        .build(&index, ids)
        .unwrap();
    (index, storage, corpus)
}

fn run(corpus_docs: &[(&str, &str)], request: CollocatesRequest) -> Vec<Collocate> {
    let (index, _storage, corpus) = build_corpus(corpus_docs);
    let mapper = CorpusMapper::new(index, &corpus).unwrap();
    Collocates::new(request).execute(&mapper).unwrap()
}

#[test]
fn test_window_is_clipped_to_document_bounds() {
    // Keyword at position 1, radius 3: the left window is position 0 only,
    // the right window is positions 2..4, and nothing extends past either
    // edge of the document.
    let results = run(
        &[("d0", "aft whale bow mast deck sail")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(3),
    );

    let mut terms: Vec<&str> = results.iter().map(|c| c.term.as_str()).collect();
    terms.sort();
    assert_eq!(terms, vec!["aft", "bow", "deck", "mast"]);
    for collocate in &results {
        assert_eq!(collocate.context_raw_freq, 1);
        assert!((collocate.context_relative_freq - 0.25).abs() < 1e-12);
    }
}

#[test]
fn test_window_at_end_of_document() {
    let results = run(
        &[("d0", "mast deck whale")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(5),
    );
    let mut terms: Vec<&str> = results.iter().map(|c| c.term.as_str()).collect();
    terms.sort();
    assert_eq!(terms, vec!["deck", "mast"]);
}

#[test]
fn test_repeated_matches_accumulate_before_ratios() {
    // "whale" matches twice, adjacent to "x" both times: one record with a
    // count of two, not two records.
    let results = run(
        &[("d0", "x whale q whale x")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(1),
    );

    let x_records: Vec<&Collocate> =
        results.iter().filter(|c| c.term == "x").collect();
    assert_eq!(x_records.len(), 1);
    assert_eq!(x_records[0].context_raw_freq, 2);
    // Context totals: x twice, q twice (once per neighboring match).
    assert!((x_records[0].context_relative_freq - 0.5).abs() < 1e-12);
}

#[test]
fn test_document_frequencies_cover_whole_document() {
    let results = run(
        &[("d0", "port whale port starboard port port")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(1),
    );

    // Only "port" (position 0 and 2) is inside the radius-1 windows.
    assert_eq!(results.len(), 1);
    let port = &results[0];
    assert_eq!(port.term, "port");
    assert_eq!(port.context_raw_freq, 2);
    // Whole-document figures come from one term-vector pass.
    assert_eq!(port.document_raw_freq, 4);
    assert!((port.document_relative_freq - 4.0 / 6.0).abs() < 1e-12);
}

#[test]
fn test_stopwords_are_skipped_in_windows() {
    let results = run(
        &[("d0", "the whale the mast")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(2)
            .with_stopwords(StopwordSet::from_words(["the"])),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].term, "mast");
    // Stopwords do not enter the context total either.
    assert!((results[0].context_relative_freq - 1.0).abs() < 1e-12);
}

#[test]
fn test_results_merge_across_documents() {
    let results = run(
        &[
            ("d0", "storm whale storm"),
            ("d1", "calm whale calm"),
        ],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(1),
    );

    assert_eq!(results.len(), 2);
    // Both records tally 2 context occurrences; the tie breaks on term.
    assert_eq!(results[0].term, "calm");
    assert_eq!(results[0].document_position, 1);
    assert_eq!(results[1].term, "storm");
    assert_eq!(results[1].document_position, 0);
}

#[test]
fn test_limit_bounds_merged_results() {
    let results = run(
        &[
            ("d0", "gale whale gale gale whale"),
            ("d1", "breeze whale breeze"),
        ],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale"])
            .with_context(1)
            .with_limit(1)
            .with_sort(CollocateSort::ContextRawFreqDesc),
    );

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].term, "gale");
}

#[test]
fn test_multiple_keywords_tally_separately() {
    let results = run(
        &[("d0", "mast whale ship deck")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["whale", "ship"])
            .with_context(1),
    );

    let whale_terms: Vec<&str> = results
        .iter()
        .filter(|c| c.keyword == "whale")
        .map(|c| c.term.as_str())
        .collect();
    let ship_terms: Vec<&str> = results
        .iter()
        .filter(|c| c.keyword == "ship")
        .map(|c| c.term.as_str())
        .collect();
    assert_eq!(whale_terms.len(), 2);
    assert!(whale_terms.contains(&"mast"));
    assert!(whale_terms.contains(&"ship"));
    assert_eq!(ship_terms.len(), 2);
    assert!(ship_terms.contains(&"whale"));
    assert!(ship_terms.contains(&"deck"));
}

#[test]
fn test_phrase_keyword_windows_flank_the_phrase() {
    let results = run(
        &[("d0", "aft white whale bow")],
        CollocatesRequest::new(TokenType::Lexical)
            .with_queries(["\"white whale\""])
            .with_context(1),
    );

    let mut terms: Vec<&str> = results.iter().map(|c| c.term.as_str()).collect();
    terms.sort();
    // The window sits around the whole phrase, not inside it.
    assert_eq!(terms, vec!["aft", "bow"]);
}

#[test]
fn test_no_queries_is_invalid() {
    let (index, _storage, corpus) = build_corpus(&[("d0", "whale")]);
    let mapper = CorpusMapper::new(index, &corpus).unwrap();
    let err = Collocates::new(CollocatesRequest::new(TokenType::Lexical))
        .execute(&mapper)
        .unwrap_err();
    assert!(matches!(err, ConcordError::InvalidArgument(_)));
}

#[test]
fn test_keyword_with_no_matches_yields_nothing() {
    let results = run(
        &[("d0", "calm sea")],
        CollocatesRequest::new(TokenType::Lexical).with_queries(["kraken"]),
    );
    assert!(results.is_empty());
}
