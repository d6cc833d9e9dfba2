//! Query model and parser for analytics requests.
//!
//! Callers hand the engines plain query strings. The grammar is the small
//! set of shapes the statistics tools need:
//!
//! - `whale` — a bare term
//! - `wha*e` / `wh?le` — a wildcard term, expanded against the term
//!   dictionary
//! - `"white whale"` — a quoted phrase, matched at consecutive positions
//! - `whale|ship` — alternation (boolean OR of the alternatives)
//!
//! Terms are normalized to lowercase to match the analysis pipeline.
//! Anything that fails to parse is reported as
//! [`ConcordError::MalformedQuery`] naming the offending query string, so a
//! caller running several queries can tell which one was rejected.

use crate::error::{ConcordError, Result};

/// A parsed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Exact term match.
    Term(String),
    /// Wildcard term match: `*` matches any run of characters, `?` exactly
    /// one.
    Wildcard(String),
    /// Exact phrase: terms at consecutive positions.
    Phrase(Vec<String>),
    /// Any of the alternatives.
    Or(Vec<Query>),
}

impl Query {
    /// Parse a query string.
    pub fn parse(input: &str) -> Result<Query> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ConcordError::malformed_query(input, "empty query"));
        }
        let alternatives: Vec<&str> = trimmed.split('|').collect();
        if alternatives.len() == 1 {
            return Self::parse_atom(input, alternatives[0]);
        }
        let mut parsed = Vec::with_capacity(alternatives.len());
        for alternative in alternatives {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                return Err(ConcordError::malformed_query(input, "empty alternative"));
            }
            parsed.push(Self::parse_atom(input, alternative)?);
        }
        Ok(Query::Or(parsed))
    }

    fn parse_atom(input: &str, atom: &str) -> Result<Query> {
        let atom = atom.trim();
        if let Some(inner) = atom.strip_prefix('"') {
            let Some(inner) = inner.strip_suffix('"') else {
                return Err(ConcordError::malformed_query(input, "unbalanced quote"));
            };
            let words: Vec<String> = inner.split_whitespace().map(str::to_lowercase).collect();
            return match words.len() {
                0 => Err(ConcordError::malformed_query(input, "empty phrase")),
                1 => Ok(Query::Term(words.into_iter().next().unwrap())),
                _ => Ok(Query::Phrase(words)),
            };
        }
        if atom.contains('"') {
            return Err(ConcordError::malformed_query(input, "unbalanced quote"));
        }
        if atom.split_whitespace().count() > 1 {
            return Err(ConcordError::malformed_query(
                input,
                "unquoted phrase; wrap multi-word queries in double quotes",
            ));
        }
        let term = atom.to_lowercase();
        if term.contains('*') || term.contains('?') {
            Ok(Query::Wildcard(term))
        } else {
            Ok(Query::Term(term))
        }
    }

    /// The bare term, if this query is a single exact term.
    ///
    /// Used to pick the aggregate-cache lookup fast path.
    pub fn as_single_term(&self) -> Option<&str> {
        match self {
            Query::Term(t) => Some(t),
            _ => None,
        }
    }

    /// Whether evaluating this query requires token positions.
    pub fn is_positional(&self) -> bool {
        match self {
            Query::Term(_) | Query::Wildcard(_) => false,
            Query::Phrase(_) => true,
            Query::Or(alternatives) => alternatives.iter().any(Query::is_positional),
        }
    }

    /// Compile a wildcard pattern into an anchored regex.
    pub(crate) fn wildcard_regex(pattern: &str) -> Result<regex::Regex> {
        let mut escaped = String::with_capacity(pattern.len() + 8);
        escaped.push('^');
        for c in pattern.chars() {
            match c {
                '*' => escaped.push_str(".*"),
                '?' => escaped.push('.'),
                _ => escaped.push_str(&regex::escape(&c.to_string())),
            }
        }
        escaped.push('$');
        regex::Regex::new(&escaped)
            .map_err(|e| ConcordError::malformed_query(pattern, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_term() {
        assert_eq!(Query::parse("Whale").unwrap(), Query::Term("whale".into()));
    }

    #[test]
    fn test_parse_wildcard() {
        assert_eq!(
            Query::parse("wha*").unwrap(),
            Query::Wildcard("wha*".into())
        );
        assert_eq!(
            Query::parse("wh?le").unwrap(),
            Query::Wildcard("wh?le".into())
        );
    }

    #[test]
    fn test_parse_phrase() {
        assert_eq!(
            Query::parse("\"White Whale\"").unwrap(),
            Query::Phrase(vec!["white".into(), "whale".into()])
        );
    }

    #[test]
    fn test_single_word_phrase_is_term() {
        assert_eq!(
            Query::parse("\"whale\"").unwrap(),
            Query::Term("whale".into())
        );
    }

    #[test]
    fn test_parse_alternation() {
        assert_eq!(
            Query::parse("whale|ship").unwrap(),
            Query::Or(vec![Query::Term("whale".into()), Query::Term("ship".into())])
        );
    }

    #[test]
    fn test_parse_failures() {
        for bad in ["", "   ", "\"unbalanced", "\"\"", "a||b", "two words"] {
            let err = Query::parse(bad).unwrap_err();
            assert!(
                matches!(err, ConcordError::MalformedQuery { .. }),
                "expected malformed query for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_positional_classification() {
        assert!(!Query::parse("whale").unwrap().is_positional());
        assert!(!Query::parse("wha*").unwrap().is_positional());
        assert!(Query::parse("\"white whale\"").unwrap().is_positional());
        assert!(Query::parse("whale|\"white whale\"").unwrap().is_positional());
    }

    #[test]
    fn test_wildcard_regex() {
        let re = Query::wildcard_regex("wha*e").unwrap();
        assert!(re.is_match("whale"));
        assert!(re.is_match("whae"));
        assert!(!re.is_match("whales"));
        let re = Query::wildcard_regex("wh?le").unwrap();
        assert!(re.is_match("whale"));
        assert!(!re.is_match("whle"));
    }
}
