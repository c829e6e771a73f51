//! Byte-offset text surgery.
//!
//! Every source mutation goes through [`apply`]: callers plan a set of
//! [`Replacement`]s against one unmodified buffer and the applier checks
//! that they do not overlap before splicing them from the highest offset
//! to the lowest.

use serde::{Deserialize, Serialize};

/// One planned source mutation. `start == end` is an insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    pub start: usize,
    pub end: usize,
    pub code: String,
}

impl Replacement {
    pub fn replace(start: usize, end: usize, code: impl Into<String>) -> Self {
        Self {
            start,
            end,
            code: code.into(),
        }
    }

    pub fn insert(at: usize, code: impl Into<String>) -> Self {
        Self::replace(at, at, code)
    }

    fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("replacement {start}..{end} is out of bounds (len {len})")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("replacement {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: usize, end: usize },

    #[error("replacements {first_start}..{first_end} and {second_start}..{second_end} overlap")]
    Overlap {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },
}

/// Apply all replacements to `content` in one pass.
///
/// Ranges must be disjoint. An insertion may sit at the boundary of a
/// range but not strictly inside one. Insertions at the same offset keep
/// their input order.
pub fn apply(content: &str, replacements: &[Replacement]) -> Result<String, PatchError> {
    for r in replacements {
        if r.start > r.end || r.end > content.len() {
            return Err(PatchError::OutOfBounds {
                start: r.start,
                end: r.end,
                len: content.len(),
            });
        }
        if !content.is_char_boundary(r.start) || !content.is_char_boundary(r.end) {
            return Err(PatchError::NotCharBoundary {
                start: r.start,
                end: r.end,
            });
        }
    }

    // Ascending by start; at equal starts insertions go first and otherwise
    // the input order is kept (sort is stable).
    let mut ordered: Vec<&Replacement> = replacements.iter().collect();
    ordered.sort_by_key(|r| (r.start, !r.is_insertion()));

    let mut widest: Option<&Replacement> = None;
    for r in &ordered {
        if let Some(prev) = widest {
            if r.start < prev.end {
                return Err(PatchError::Overlap {
                    first_start: prev.start,
                    first_end: prev.end,
                    second_start: r.start,
                    second_end: r.end,
                });
            }
        }
        if widest.map_or(true, |prev| r.end > prev.end) {
            widest = Some(r);
        }
    }

    let mut result = content.to_string();
    for r in ordered.iter().rev() {
        result.replace_range(r.start..r.end, &r.code);
    }
    Ok(result)
}

/// Maps byte offsets to 1-based line / 1-based character columns and back.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    content: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(content: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(content.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            content,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Line and column of the character starting at `offset`.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line_idx];
        let column = self.content[start..offset].chars().count() + 1;
        (line_idx + 1, column)
    }

    /// Byte offset of `line`/`column`, if that position exists.
    pub fn offset(&self, line: usize, column: usize) -> Option<usize> {
        if line == 0 || column == 0 {
            return None;
        }
        let start = *self.line_starts.get(line - 1)?;
        let text = self.line_text(line)?;
        if column == 1 {
            return Some(start);
        }
        text.char_indices()
            .nth(column - 1)
            .map(|(i, _)| start + i)
            .or_else(|| (text.chars().count() == column - 1).then_some(start + text.len()))
    }

    /// Text of a 1-based line without its line terminator.
    pub fn line_text(&self, line: usize) -> Option<&'a str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map(|next| next - 1)
            .unwrap_or(self.content.len());
        let text = &self.content[start..end];
        Some(text.strip_suffix('\r').unwrap_or(text))
    }

    /// Byte offset where `line` starts.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line.checked_sub(1)?).copied()
    }

    /// Lines `line - radius ..= line + radius`, clamped to the file.
    pub fn window(&self, line: usize, radius: usize) -> String {
        let first = line.saturating_sub(radius).max(1);
        let last = (line + radius).min(self.line_count());
        (first..=last)
            .filter_map(|l| self.line_text(l))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
