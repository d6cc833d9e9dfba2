//! Whole-corpus term aggregates, computed once and cached.
//!
//! Building the aggregates is one full scan of every corpus document's
//! term vector — O(total distinct (document, term) pairs) — so the result
//! is persisted and keyed by `(corpus id, token type, index version)`.
//! A key mismatch (the corpus or index changed) simply produces a new
//! cache entry; stale entries are never reused.
//!
//! `TermAggregates` is a scoped handle: open it, use it for one
//! computation, then drop or [`close`](TermAggregates::close) it. It is
//! never shared as a long-lived mutable singleton across requests, so
//! concurrent requests cannot conflict over its backing blob.

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use ahash::AHashMap;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, warn};

use crate::corpus::TokenType;
use crate::error::{ConcordError, Result};
use crate::mapper::CorpusMapper;
use crate::storage::Storage;

const MAGIC: &[u8; 4] = b"CTA1";

/// Aggregate statistics for one term across a whole corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermAggregateRecord {
    /// The term text.
    pub term: String,
    /// Total occurrences across all corpus documents.
    pub raw_freq: u64,
    /// Number of distinct documents containing the term at least once.
    pub documents_count: u64,
}

/// A scoped handle over the aggregate term table of one
/// (corpus, token type).
pub struct TermAggregates {
    records: AHashMap<String, TermAggregateRecord>,
}

impl TermAggregates {
    /// Open the aggregates for one corpus and token type.
    ///
    /// Loads the persisted table when a valid cache entry exists for the
    /// current index version; otherwise builds it with a full term-vector
    /// scan and persists it. A corrupt persisted entry is discarded and
    /// rebuilt once; a second failure is surfaced as a storage error.
    pub fn open(
        mapper: &CorpusMapper<'_>,
        token_type: TokenType,
        storage: &Arc<dyn Storage>,
    ) -> Result<TermAggregates> {
        let key = cache_key(
            mapper.corpus().id(),
            token_type,
            mapper.index().index_version(),
        );
        if storage.exists(&key) {
            match decode(&storage.read(&key)?) {
                Ok(records) => {
                    debug!(
                        "loaded {} term aggregates for corpus '{}' ({token_type})",
                        records.len(),
                        mapper.corpus().id()
                    );
                    return Ok(TermAggregates { records });
                }
                Err(e) => {
                    warn!("discarding unreadable term aggregate cache '{key}': {e}");
                    storage.delete(&key)?;
                }
            }
        }

        let started = Instant::now();
        let records = build(mapper, token_type)?;
        debug!(
            "built {} term aggregates for corpus '{}' ({token_type}) in {:?}",
            records.len(),
            mapper.corpus().id(),
            started.elapsed()
        );

        let encoded = encode(&records);
        if !storage.create_if_absent(&key, &encoded)? {
            // Another writer built the same key concurrently; use theirs so
            // every reader of this key sees one table. If that copy cannot
            // be decoded either, the backing store is unusable.
            return Ok(TermAggregates {
                records: decode(&storage.read(&key)?)
                    .map_err(|e| ConcordError::storage(format!("reread cache '{key}': {e}")))?,
            });
        }
        Ok(TermAggregates { records })
    }

    /// Look up one term's aggregate record.
    pub fn get(&self, term: &str) -> Option<&TermAggregateRecord> {
        self.records.get(term)
    }

    /// Iterate over all records, in unspecified order.
    pub fn values(&self) -> impl Iterator<Item = &TermAggregateRecord> {
        self.records.values()
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus has no terms of this token type.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Release the handle.
    ///
    /// Equivalent to dropping it; spelled out so call sites mark the end
    /// of the computation the handle was opened for.
    pub fn close(self) {}
}

impl std::fmt::Debug for TermAggregates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TermAggregates")
            .field("terms", &self.records.len())
            .finish()
    }
}

fn cache_key(corpus_id: &str, token_type: TokenType, index_version: u64) -> String {
    format!("termagg_{corpus_id}_{token_type}_{index_version}.bin")
}

/// Full scan: one pass over every corpus document's term vector, in corpus
/// order. Each distinct (document, term) pair contributes its frequency to
/// the term's raw count and exactly one to its documents count.
fn build(
    mapper: &CorpusMapper<'_>,
    token_type: TokenType,
) -> Result<AHashMap<String, TermAggregateRecord>> {
    let mut records: AHashMap<String, TermAggregateRecord> = AHashMap::new();
    for &doc in mapper.doc_refs() {
        let Some(vector) = mapper.term_vector(doc, token_type)? else {
            continue;
        };
        for (term, entry) in vector.iter() {
            match records.get_mut(term) {
                Some(record) => {
                    record.raw_freq += entry.freq;
                    record.documents_count += 1;
                }
                None => {
                    records.insert(
                        term.to_string(),
                        TermAggregateRecord {
                            term: term.to_string(),
                            raw_freq: entry.freq,
                            documents_count: 1,
                        },
                    );
                }
            }
        }
    }
    Ok(records)
}

/// Binary layout: magic, record count, then per record a length-prefixed
/// term and two counters, with a CRC32 of everything preceding it at the
/// end.
fn encode(records: &AHashMap<String, TermAggregateRecord>) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + records.len() * 24);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(records.len() as u64).to_le_bytes());
    let mut terms: Vec<&TermAggregateRecord> = records.values().collect();
    terms.sort_by(|a, b| a.term.cmp(&b.term));
    for record in terms {
        out.extend_from_slice(&(record.term.len() as u32).to_le_bytes());
        out.extend_from_slice(record.term.as_bytes());
        out.extend_from_slice(&record.raw_freq.to_le_bytes());
        out.extend_from_slice(&record.documents_count.to_le_bytes());
    }
    let checksum = crc32fast::hash(&out);
    out.extend_from_slice(&checksum.to_le_bytes());
    out
}

fn decode(bytes: &[u8]) -> Result<AHashMap<String, TermAggregateRecord>> {
    if bytes.len() < MAGIC.len() + 12 {
        return Err(ConcordError::storage("aggregate cache truncated"));
    }
    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if crc32fast::hash(body) != stored {
        return Err(ConcordError::storage("aggregate cache checksum mismatch"));
    }
    let mut cursor = body;
    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(ConcordError::storage("aggregate cache bad magic"));
    }
    let count = cursor.read_u64::<LittleEndian>()?;
    let mut records = AHashMap::with_capacity(count as usize);
    for _ in 0..count {
        let term_len = cursor.read_u32::<LittleEndian>()? as usize;
        if cursor.len() < term_len {
            return Err(ConcordError::storage("aggregate cache truncated record"));
        }
        let (term_bytes, rest) = cursor.split_at(term_len);
        cursor = rest;
        let term = std::str::from_utf8(term_bytes)
            .map_err(|e| ConcordError::storage(format!("aggregate cache term: {e}")))?
            .to_string();
        let raw_freq = cursor.read_u64::<LittleEndian>()?;
        let documents_count = cursor.read_u64::<LittleEndian>()?;
        records.insert(
            term.clone(),
            TermAggregateRecord {
                term,
                raw_freq,
                documents_count,
            },
        );
    }
    Ok(records)
}
