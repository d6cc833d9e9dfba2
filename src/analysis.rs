//! Text analysis helpers for the reference index backend.
//!
//! The pipeline is deliberately small: text is segmented on Unicode word
//! bounds, lowercased, and filtered according to the requested token type.
//! Production deployments plug in their own indexing stack behind the
//! [`IndexReader`](crate::index::IndexReader) contract; this module only has
//! to be good enough to feed the in-memory backend and the test suite.

use unicode_segmentation::UnicodeSegmentation;

use crate::corpus::TokenType;

/// Split `text` into lowercased tokens for the given token type.
///
/// `TokenType::All` keeps every word-bounded token, including numerals.
/// `TokenType::Lexical` keeps only tokens containing at least one alphabetic
/// character, which is what the word-frequency statistics operate on.
///
/// Token positions are implicit: a token's position is its index in the
/// returned sequence.
pub fn tokenize(text: &str, token_type: TokenType) -> Vec<String> {
    text.unicode_words()
        .filter(|w| match token_type {
            TokenType::All => true,
            TokenType::Lexical => w.chars().any(|c| c.is_alphabetic()),
        })
        .map(|w| w.to_lowercase())
        .collect()
}
