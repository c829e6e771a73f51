use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::config::Config;
use crate::keys::slugify;
use crate::scanner::{Candidate, SyntacticContext};

/// Why a candidate was not accepted as UI text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    TooShort,
    TooLong,
    IgnorePattern,
    NoLetters,
    Url,
    Path,
    ClassList,
    Identifier,
    CodeLike,
    HashLike,
    Numeral,
    Placeholder,
    EmptySlug,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TooShort => "too-short",
            RejectReason::TooLong => "too-long",
            RejectReason::IgnorePattern => "ignore-pattern",
            RejectReason::NoLetters => "no-letters",
            RejectReason::Url => "url",
            RejectReason::Path => "path",
            RejectReason::ClassList => "class-list",
            RejectReason::Identifier => "identifier",
            RejectReason::CodeLike => "code-like",
            RejectReason::HashLike => "hash-like",
            RejectReason::Numeral => "numeral",
            RejectReason::Placeholder => "placeholder",
            RejectReason::EmptySlug => "empty-slug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub candidate: Candidate,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    pub accepted: Vec<Candidate>,
    pub rejected: Vec<Rejection>,
}

/// The filter chain: length bounds, ignore patterns, structural
/// heuristics and a non-empty slug must all pass.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    min_length: usize,
    max_length: usize,
    ignore_patterns: Vec<Regex>,
    slug_max_words: usize,
    slug_max_chars: usize,
}

impl CandidateFilter {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            min_length: config.min_length,
            max_length: config.max_length,
            ignore_patterns: config.compiled_ignore_patterns()?,
            slug_max_words: config.slug_max_words,
            slug_max_chars: config.slug_max_chars,
        })
    }

    pub fn check(&self, candidate: &Candidate) -> Result<(), RejectReason> {
        let text = candidate.text.as_str();
        let length = text.chars().count();
        if length < self.min_length {
            return Err(RejectReason::TooShort);
        }
        if length > self.max_length {
            return Err(RejectReason::TooLong);
        }
        if self.ignore_patterns.iter().any(|re| re.is_match(text)) {
            return Err(RejectReason::IgnorePattern);
        }
        if let Some(reason) = structural_reason(text, candidate.syntactic_context) {
            return Err(reason);
        }
        if slugify(text, self.slug_max_words, self.slug_max_chars).is_empty() {
            return Err(RejectReason::EmptySlug);
        }
        Ok(())
    }

    pub fn partition(&self, candidates: Vec<Candidate>) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();
        for candidate in candidates {
            match self.check(&candidate) {
                Ok(()) => outcome.accepted.push(candidate),
                Err(reason) => outcome.rejected.push(Rejection { candidate, reason }),
            }
        }
        outcome
    }
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://|mailto:|tel:|www\.|//)\S*$")
            .expect("URL pattern is invalid - this is a bug")
    })
}

fn path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\.{1,2}/|[@~]/|/)[^\s]*$|^[\w.\-\[\]@]+(?:/[\w.\-\[\]()@]+)+/?$")
            .expect("Path pattern is invalid - this is a bug")
    })
}

fn class_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^!?-?[a-z0-9][a-z0-9]*(?:[-:/.][a-z0-9\[\]#%.()]+|\[[^\s\]]+\])*$")
            .expect("Class token pattern is invalid - this is a bug")
    })
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:",
            r"[a-z][a-z0-9]*",                 // lowercase / flag words
            r"|[a-z][a-z0-9]*(?:[A-Z][a-z0-9]*)+", // camelCase
            r"|[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+", // PascalCase with two humps
            r"|[A-Za-z][A-Za-z0-9]*(?:_[A-Za-z0-9]+)+", // snake_case
            r"|[a-z][a-z0-9]*(?:-[a-z0-9]+)+", // kebab-case
            r"|[A-Z][A-Z0-9]*",                // CONSTANT, currency codes
            r")$"
        ))
        .expect("Identifier pattern is invalid - this is a bug")
    })
}

fn hash_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:#?[0-9a-fA-F]{6,}|#[0-9a-fA-F]{3,4}|[A-Za-z0-9_\-+/=]{20,})$")
            .expect("Hash pattern is invalid - this is a bug")
    })
}

fn numeral_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[-+]?\d[\d.,\s]*\s*(?:px|em|rem|%|vh|vw|pt|ms|s|kb|mb|gb|k|m|x)?$")
            .expect("Numeral pattern is invalid - this is a bug")
    })
}

/// Structural heuristics. Markup text is only checked for the shapes that
/// can never be visible copy (a single word between tags is UI text).
pub fn structural_reason(text: &str, context: SyntacticContext) -> Option<RejectReason> {
    let text = text.trim();

    if !text.chars().any(char::is_alphabetic) {
        return Some(RejectReason::NoLetters);
    }
    if url_regex().is_match(text) {
        return Some(RejectReason::Url);
    }
    if path_regex().is_match(text) {
        return Some(RejectReason::Path);
    }
    if is_hash_like(text) {
        return Some(RejectReason::HashLike);
    }
    if numeral_regex().is_match(text) {
        return Some(RejectReason::Numeral);
    }
    if context == SyntacticContext::MarkupText {
        return None;
    }

    if text.contains("{{") || text.contains("${") || text.starts_with('{') || text.starts_with('$') {
        return Some(RejectReason::Placeholder);
    }
    if is_class_list(text) {
        return Some(RejectReason::ClassList);
    }
    if identifier_regex().is_match(text) {
        return Some(RejectReason::Identifier);
    }
    if is_code_like(text) {
        return Some(RejectReason::CodeLike);
    }
    None
}

fn is_hash_like(text: &str) -> bool {
    hash_regex().is_match(text)
        && text.chars().any(|c| c.is_ascii_digit())
        && text.chars().any(|c| c.is_ascii_alphabetic())
}

/// `flex items-center gap-2`, `hidden md:block`: every token is a lowercase
/// utility-class shape and at least one carries a class separator.
fn is_class_list(text: &str) -> bool {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.iter().all(|t| class_token_regex().is_match(t))
        && tokens
            .iter()
            .any(|t| t.contains('-') || t.contains(':') || t.contains('/') || t.contains('['))
}

/// A single token with code punctuation inside it (`user@host`, `a.b.c`,
/// `key=value`). Trailing sentence punctuation does not count.
fn is_code_like(text: &str) -> bool {
    if text.contains(char::is_whitespace) {
        return false;
    }
    let body = text.trim_end_matches(['.', '!', '?', ':', '…']);
    body.contains([':', '/', '.', '@', '#', '=', '&', '?', '_', '<', '>'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, context: SyntacticContext) -> Candidate {
        Candidate {
            text: text.to_string(),
            raw: format!("\"{}\"", text),
            file: "src/app/page.tsx".to_string(),
            line: 1,
            column: 1,
            syntactic_context: context,
            attribute: None,
            surrounding_context: String::new(),
        }
    }

    fn literal(text: &str) -> Option<RejectReason> {
        structural_reason(text, SyntacticContext::StringLiteral)
    }

    #[test]
    fn test_structural_false_positives_rejected() {
        assert_eq!(literal("flex items-center gap-2"), Some(RejectReason::ClassList));
        assert_eq!(literal("/deliverer/wallet/withdrawal"), Some(RejectReason::Path));
        assert_eq!(literal("EUR"), Some(RejectReason::Identifier));
        assert_eq!(literal("https://example.com/a"), Some(RejectReason::Url));
        assert_eq!(literal("mailto:team@example.com"), Some(RejectReason::Url));
        assert_eq!(literal("./components/Button"), Some(RejectReason::Path));
        assert_eq!(literal("@/lib/utils"), Some(RejectReason::Path));
        assert_eq!(literal("userId"), Some(RejectReason::Identifier));
        assert_eq!(literal("user_id"), Some(RejectReason::Identifier));
        assert_eq!(literal("primary"), Some(RejectReason::Identifier));
        assert_eq!(literal("UserProfile"), Some(RejectReason::Identifier));
        assert_eq!(literal("a1b2c3d4e5f6"), Some(RejectReason::HashLike));
        assert_eq!(literal("#ff00aa"), Some(RejectReason::HashLike));
        assert_eq!(literal("12px"), Some(RejectReason::Numeral));
        assert_eq!(literal("42"), Some(RejectReason::NoLetters));
        assert_eq!(literal("user@example.com"), Some(RejectReason::CodeLike));
        assert_eq!(literal("{count} items"), Some(RejectReason::Placeholder));
        assert_eq!(literal("hidden md:block"), Some(RejectReason::ClassList));
    }

    #[test]
    fn test_ui_text_accepted() {
        assert_eq!(literal("Save changes"), None);
        assert_eq!(literal("Dashboard"), None);
        assert_eq!(literal("Why?"), None);
        assert_eq!(literal("Payment received."), None);
        assert_eq!(literal("Rafraîchir"), None);
        assert_eq!(literal("please try again"), None);
    }

    #[test]
    fn test_markup_text_single_word_is_ui_text() {
        assert_eq!(structural_reason("Rafraîchir", SyntacticContext::MarkupText), None);
        assert_eq!(structural_reason("Dashboard", SyntacticContext::MarkupText), None);
        assert_eq!(structural_reason("EUR", SyntacticContext::MarkupText), None);
        assert_eq!(
            structural_reason("© 2024", SyntacticContext::MarkupText),
            Some(RejectReason::NoLetters)
        );
    }

    #[test]
    fn test_filter_chain_order() {
        let config = Config {
            min_length: 3,
            max_length: 20,
            ignore_patterns: vec!["^Lorem".to_string()],
            ..Config::default()
        };
        let filter = CandidateFilter::from_config(&config).unwrap();

        let check = |text: &str| filter.check(&candidate(text, SyntacticContext::MarkupText));
        assert_eq!(check("Hi"), Err(RejectReason::TooShort));
        assert_eq!(check("This sentence is far too long"), Err(RejectReason::TooLong));
        assert_eq!(check("Lorem ipsum"), Err(RejectReason::IgnorePattern));
        assert_eq!(check("Welcome back"), Ok(()));
    }

    #[test]
    fn test_empty_slug_rejected() {
        let filter = CandidateFilter::from_config(&Config::default()).unwrap();
        let outcome = filter.partition(vec![
            candidate("✨✨ ⭐", SyntacticContext::MarkupText),
            candidate("Sign in", SyntacticContext::MarkupText),
        ]);
        assert_eq!(outcome.accepted.len(), 1);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].reason, RejectReason::NoLetters);

        // Letters, but nothing the ASCII slug alphabet keeps.
        let outcome = filter.partition(vec![candidate("保存する", SyntacticContext::MarkupText)]);
        assert_eq!(outcome.rejected[0].reason, RejectReason::EmptySlug);
    }
}
