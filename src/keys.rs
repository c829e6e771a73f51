use serde::{Deserialize, Serialize};
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::error::LiftError;
use crate::scanner::Candidate;
use crate::store::{KeyStore, LeafProbe};

/// Highest numeric suffix tried before giving up on a key.
pub const MAX_SUFFIX: usize = 999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStatus {
    /// Written to the source locale by this run
    New,
    /// The leaf already held exactly this text
    Reused,
}

/// A candidate with its derived key attached. This is also the manifest
/// record consumed by `replace`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub suggested_key: String,
    pub namespace: String,
    pub status: KeyStatus,
}

impl KeyedCandidate {
    /// The key without its namespace segment, as passed to the accessor.
    pub fn relative_key(&self) -> &str {
        self.suggested_key
            .strip_prefix(&self.namespace)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(&self.suggested_key)
    }
}

/// Result of deriving one key.
#[derive(Debug, Clone)]
pub struct Derived {
    pub entry: KeyedCandidate,
    /// The naive key was taken and a numeric suffix was needed
    pub suffixed: bool,
}

pub struct KeyDeriver<'a> {
    config: &'a Config,
}

impl<'a> KeyDeriver<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    /// Namespace from the first directory segment (under the scan root)
    /// that is not a grouping, route-group or dynamic segment.
    pub fn namespace_for(&self, within_root: &str) -> String {
        let mut segments: Vec<&str> = within_root.split('/').filter(|s| !s.is_empty()).collect();
        segments.pop();

        segments
            .into_iter()
            .find(|segment| {
                !self.config.grouping_segments.iter().any(|g| g == segment)
                    && !(segment.starts_with('(') && segment.ends_with(')'))
                    && !(segment.starts_with('[') && segment.ends_with(']'))
            })
            .map(|segment| segment.replace('.', "_"))
            .unwrap_or_else(|| self.config.default_namespace.clone())
    }

    pub fn key_for(&self, within_root: &str, text: &str) -> (String, String) {
        let namespace = self.namespace_for(within_root);
        let component = component_name(within_root);
        let slug = slugify(text, self.config.slug_max_words, self.config.slug_max_chars);
        let key = format!("{}.{}.{}", namespace, component, slug);
        (namespace, key)
    }

    /// Attach a unique key to `candidate`, writing new leaves to the source
    /// locale. A leaf holding the same text is reused; a leaf holding other
    /// text (or a path blocked by the tree's shape) moves on to `_1`, `_2`, ...
    pub fn derive(
        &self,
        within_root: &str,
        candidate: Candidate,
        store: &mut KeyStore,
    ) -> Result<Derived, LiftError> {
        let (namespace, base) = self.key_for(within_root, &candidate.text);
        let locale = self.config.source_locale.clone();

        for attempt in 0..=MAX_SUFFIX {
            let key = if attempt == 0 {
                base.clone()
            } else {
                format!("{}_{}", base, attempt)
            };

            let status = match store.probe(&locale, &key, &candidate.text) {
                LeafProbe::Free => {
                    store.set_leaf(&locale, &key, &candidate.text, false)?;
                    KeyStatus::New
                }
                LeafProbe::Same => KeyStatus::Reused,
                LeafProbe::Different(_) | LeafProbe::Blocked(_) => continue,
            };

            return Ok(Derived {
                entry: KeyedCandidate {
                    candidate,
                    suggested_key: key,
                    namespace,
                    status,
                },
                suffixed: attempt > 0,
            });
        }

        Err(LiftError::SuffixExhausted {
            path: base,
            attempts: MAX_SUFFIX,
        })
    }
}

/// File name without extension(s); dots become underscores.
pub fn component_name(path: &str) -> String {
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path);
    let stem = match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    };
    stem.replace('.', "_")
}

/// Lowercase ASCII slug: accents folded, punctuation dropped, whitespace
/// collapsed to `_`, cut to `max_words` words and `max_chars` characters.
/// Empty when nothing survives.
pub fn slugify(text: &str, max_words: usize, max_chars: usize) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    let joined = folded
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<_>>()
        .join("_");

    let cut: String = joined.chars().take(max_chars).collect();
    cut.trim_matches('_').to_string()
}

/// `deliverer-wallet` → `DelivererWallet`
pub fn pascal_case(namespace: &str) -> String {
    namespace
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
