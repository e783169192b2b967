//! Blocklist patterns.
//!
//! A plain entry matches as a case-insensitive substring, with runs of
//! whitespace on either side compared as a single space. An entry prefixed
//! with `re:` is a case-insensitive regular expression.

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::errors::{GuardrailError, Result};

/// Prefix marking a regular-expression blocklist entry.
pub const REGEX_PREFIX: &str = "re:";

fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Clone, Debug)]
enum Matcher {
    Substring(String),
    Regex(Regex),
}

/// One compiled blocklist entry.
#[derive(Clone, Debug)]
pub struct BlockPattern {
    raw: String,
    matcher: Matcher,
}

impl BlockPattern {
    /// Compile an entry, rejecting invalid regular expressions.
    pub fn parse(raw: &str) -> Result<Self> {
        let matcher = match raw.strip_prefix(REGEX_PREFIX) {
            Some(expr) => Matcher::Regex(
                RegexBuilder::new(expr)
                    .case_insensitive(true)
                    .build()
                    .map_err(|source| GuardrailError::InvalidPattern {
                        pattern: raw.to_string(),
                        source,
                    })?,
            ),
            None => Matcher::Substring(fold(raw)),
        };
        Ok(Self {
            raw: raw.to_string(),
            matcher,
        })
    }

    /// Compile an entry; an invalid regular expression degrades to a
    /// substring match on its text.
    pub fn lenient(raw: &str) -> Self {
        Self::parse(raw).unwrap_or_else(|e| {
            warn!(error = %e, "treating invalid blocklist regex as a literal");
            let literal = raw.strip_prefix(REGEX_PREFIX).unwrap_or(raw);
            Self {
                raw: raw.to_string(),
                matcher: Matcher::Substring(fold(literal)),
            }
        })
    }

    /// The entry as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern occurs in `text`.
    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Substring(needle) => !needle.is_empty() && fold(text).contains(needle),
            Matcher::Regex(re) => re.is_match(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn substring_is_case_insensitive() {
        let p = BlockPattern::parse("Format C:").unwrap();
        assert!(p.matches("please FORMAT c: now"));
        assert!(!p.matches("formatting"));
    }

    #[test]
    fn substring_ignores_whitespace_runs() {
        let p = BlockPattern::parse("rm -rf").unwrap();
        assert!(p.matches("rm  -rf /tmp/x"));
        assert!(p.matches("echo ok;rm\t-rf /"));
        assert!(BlockPattern::parse("rm   -RF").unwrap().matches("sudo rm -rf /"));
        assert!(!p.matches("rm -r -f"));
    }

    #[test]
    fn regex_entries() {
        let p = BlockPattern::parse(r"re:rm\s+-rf\s+/").unwrap();
        assert!(p.matches("sudo RM  -rf /var"));
        assert!(!p.matches("rm -r ./build"));
        assert_eq!(p.as_str(), r"re:rm\s+-rf\s+/");
    }

    #[test]
    fn invalid_regex_is_rejected_or_degraded() {
        assert_matches!(
            BlockPattern::parse("re:(unclosed"),
            Err(GuardrailError::InvalidPattern { .. })
        );
        let p = BlockPattern::lenient("re:(unclosed");
        assert!(p.matches("echo (UNCLOSED"));
        assert!(!p.matches("echo closed"));
    }

    #[test]
    fn empty_substring_never_matches() {
        assert!(!BlockPattern::parse("").unwrap().matches("anything"));
    }
}
