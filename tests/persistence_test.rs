use std::sync::Arc;

use tempfile::TempDir;

use concord::corpus::TokenType;
use concord::corpus::builder::CorpusBuilder;
use concord::index::IndexReader;
use concord::index::memory::MemoryIndex;
use concord::mapper::CorpusMapper;
use concord::storage::file::FileStorageConfig;
use concord::storage::{StorageConfig, StorageFactory};
use concord::terms::{CorpusTerms, CorpusTermsRequest};
use concord::{Corpus, StopwordSet};

fn build_index() -> Arc<dyn IndexReader> {
    let index = MemoryIndex::new();
    index
        .add_document("moby", "call me ishmael the whale waits")
        .unwrap();
    index
        .add_document("nautilus", "the captain watched the squid")
        .unwrap();
    Arc::new(index)
}

#[test]
fn test_corpus_survives_storage_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let index = build_index();

    // Build against file storage.
    let storage_config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
    let storage = StorageFactory::create(storage_config).unwrap();
    let corpus = CorpusBuilder::new(storage.clone())
        .build(&index, vec!["moby".into(), "nautilus".into()])
        .unwrap();
    let corpus_id = corpus.id().to_string();
    drop(storage);
    drop(corpus);

    // A fresh storage handle over the same directory sees the corpus and
    // its aggregate cache.
    let storage_config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
    let storage = StorageFactory::create(storage_config).unwrap();
    let corpus = Corpus::open(storage.as_ref(), &corpus_id).unwrap();
    assert_eq!(corpus.size(), 2);
    assert_eq!(corpus.tokens_count(TokenType::Lexical), 11);

    let mapper = CorpusMapper::new(index, &corpus).unwrap();
    let results = CorpusTerms::new(
        CorpusTermsRequest::new(TokenType::Lexical).with_queries(["the", "whale"]),
    )
    .execute(&mapper, &storage)
    .unwrap();

    assert_eq!(results[0].term, "the");
    assert_eq!(results[0].raw_freq, 3);
    assert_eq!(results[0].in_documents_count, 2);
    assert_eq!(results[1].term, "whale");
    assert_eq!(results[1].raw_freq, 1);
}

#[test]
fn test_stopword_list_roundtrip_through_file_storage() {
    let temp_dir = TempDir::new().unwrap();
    let storage_config = StorageConfig::File(FileStorageConfig::new(temp_dir.path()));
    let storage = StorageFactory::create(storage_config).unwrap();

    StopwordSet::store(storage.as_ref(), "english", &["the", "me"]).unwrap();
    let stopwords = StopwordSet::load(storage.as_ref(), "english").unwrap();

    let index = build_index();
    let corpus = CorpusBuilder::new(storage.clone())
        .build(&index, vec!["moby".into()])
        .unwrap();
    let mapper = CorpusMapper::new(index, &corpus).unwrap();
    let results = CorpusTerms::new(
        CorpusTermsRequest::new(TokenType::Lexical).with_stopwords(stopwords),
    )
    .execute(&mapper, &storage)
    .unwrap();

    let terms: Vec<&str> = results.iter().map(|r| r.term.as_str()).collect();
    assert!(!terms.contains(&"the"));
    assert!(!terms.contains(&"me"));
    assert!(terms.contains(&"whale"));
}
