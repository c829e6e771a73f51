use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::LiftError;
use crate::fs::{Backups, FileSystem};

// =============================================================================
// JSON Style Detection and Custom Formatting
// =============================================================================

/// Formatting detected from an existing locale document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonStyle {
    /// Indentation string (e.g., "  ", "    ", "\t")
    pub indent: String,
    pub use_crlf: bool,
    pub trailing_newline: bool,
}

impl Default for JsonStyle {
    fn default() -> Self {
        Self {
            indent: "  ".to_string(),
            use_crlf: false,
            trailing_newline: true,
        }
    }
}

/// Detect JSON formatting style from file content
pub fn detect_json_style(content: &str) -> JsonStyle {
    let mut style = JsonStyle {
        use_crlf: content.contains("\r\n"),
        trailing_newline: content.ends_with('\n'),
        ..JsonStyle::default()
    };

    // The first indented key or closing bracket gives the unit of indentation
    for line in content.lines() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed == "{" || trimmed == "[" {
            continue;
        }
        if trimmed.starts_with('"') || trimmed.starts_with('}') || trimmed.starts_with(']') {
            let indent_len = line.len() - trimmed.len();
            if indent_len > 0 {
                style.indent = line[..indent_len].to_string();
                break;
            }
        }
    }

    style
}

/// serde_json formatter that writes with a detected indent and line ending
struct StylePreservingFormatter {
    indent: Vec<u8>,
    newline: Vec<u8>,
    /// One entry per open container: whether it has any items yet
    open_containers: Vec<bool>,
}

impl StylePreservingFormatter {
    fn new(style: &JsonStyle) -> Self {
        Self {
            indent: style.indent.as_bytes().to_vec(),
            newline: if style.use_crlf {
                b"\r\n".to_vec()
            } else {
                b"\n".to_vec()
            },
            open_containers: Vec::new(),
        }
    }

    fn write_indent<W: ?Sized + Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for _ in 0..self.open_containers.len() {
            writer.write_all(&self.indent)?;
        }
        Ok(())
    }

    fn open<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> std::io::Result<()> {
        self.open_containers.push(false);
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + Write>(&mut self, writer: &mut W, bracket: &[u8]) -> std::io::Result<()> {
        let has_items = self.open_containers.pop().unwrap_or(false);
        if has_items {
            writer.write_all(&self.newline)?;
            self.write_indent(writer)?;
        }
        writer.write_all(bracket)
    }

    fn item<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        if let Some(has_items) = self.open_containers.last_mut() {
            *has_items = true;
        }
        writer.write_all(&self.newline)?;
        self.write_indent(writer)
    }
}

impl Formatter for StylePreservingFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        self.item(writer, first)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Render a tree with the given style, keys sorted alphabetically.
pub fn render_with_style(tree: &Map<String, Value>, style: &JsonStyle) -> String {
    let sorted = Value::Object(sort_keys_alphabetically(tree));
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, StylePreservingFormatter::new(style));
    // Writing a Value into a Vec cannot fail.
    let _ = sorted.serialize(&mut serializer);
    let mut out = String::from_utf8_lossy(&buffer).into_owned();
    if style.trailing_newline {
        out.push_str(if style.use_crlf { "\r\n" } else { "\n" });
    }
    out
}

/// Sort all keys in a JSON object alphabetically, nested objects included.
/// Depth is capped so hostile inputs cannot overflow the stack.
pub fn sort_keys_alphabetically(map: &Map<String, Value>) -> Map<String, Value> {
    const MAX_DEPTH: usize = 100;
    sort_keys_with_depth(map, 0, MAX_DEPTH)
}

fn sort_keys_with_depth(map: &Map<String, Value>, depth: usize, max_depth: usize) -> Map<String, Value> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut sorted = Map::new();
    for key in keys {
        let value = match &map[key] {
            Value::Object(nested) if depth < max_depth => {
                Value::Object(sort_keys_with_depth(nested, depth + 1, max_depth))
            }
            other => other.clone(),
        };
        sorted.insert(key.clone(), value);
    }
    sorted
}

// =============================================================================
// Key Store
// =============================================================================

/// What a leaf path currently holds relative to a value about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafProbe {
    /// Nothing at the path and nothing in the way
    Free,
    /// A leaf with exactly this value
    Same,
    /// A leaf with another value
    Different(String),
    /// A prefix of the path is a leaf, or the path holds nested keys
    Blocked(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropagationStats {
    /// Placeholders inserted where a target had no value
    pub inserted: usize,
    /// Existing placeholders updated to the current source text
    pub refreshed: usize,
    /// Target values left untouched
    pub preserved: usize,
    /// Paths that could not be written because of the target tree's shape
    pub conflicts: usize,
}

#[derive(Debug, Default)]
pub struct FlushOutcome {
    pub written: Vec<String>,
    pub failures: Vec<LiftError>,
}

/// Multi-locale dictionary: one nested tree per locale.
///
/// All mutation goes through `&mut self`, so a single owner serializes
/// `has_leaf` / `set_leaf`.
#[derive(Debug, Clone)]
pub struct KeyStore {
    messages_dir: PathBuf,
    source_locale: String,
    placeholder_prefix: String,
    trees: BTreeMap<String, Map<String, Value>>,
    styles: BTreeMap<String, JsonStyle>,
    /// Leaves added to the source locale since the last flush
    pending: Vec<String>,
    dirty: BTreeSet<String>,
}

impl KeyStore {
    pub fn new(messages_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            messages_dir: messages_dir.into(),
            source_locale: config.source_locale.clone(),
            placeholder_prefix: config.placeholder_prefix.clone(),
            trees: BTreeMap::new(),
            styles: BTreeMap::new(),
            pending: Vec::new(),
            dirty: BTreeSet::new(),
        }
    }

    /// An in-memory store rooted at the configured messages directory.
    pub fn empty(config: &Config) -> Self {
        Self::new(&config.messages_dir, config)
    }

    pub fn locale_path(&self, locale: &str) -> PathBuf {
        self.messages_dir.join(format!("{}.json", locale))
    }

    pub fn source_locale(&self) -> &str {
        &self.source_locale
    }

    /// Load every locale's persisted tree. A missing (or blank) document is
    /// an empty tree. A document that is not a JSON object is an error: it
    /// must not be overwritten.
    pub fn seed_from_disk<F: FileSystem>(
        &mut self,
        fs: &F,
        locales: &[String],
    ) -> Result<(), LiftError> {
        for locale in locales {
            let path = self.locale_path(locale);
            if !fs.exists(&path) {
                self.trees.entry(locale.clone()).or_default();
                continue;
            }

            let content = fs
                .read_to_string(&path)
                .map_err(|e| LiftError::persistence(path.display(), format!("{:#}", e)))?;
            let tree = parse_locale_document(&content, &path)?;
            self.styles.insert(locale.clone(), detect_json_style(&content));
            self.trees.insert(locale.clone(), tree);
        }
        Ok(())
    }

    /// Insert a tree directly (used by tests and by callers that already
    /// hold a parsed document).
    pub fn insert_tree(&mut self, locale: &str, tree: Map<String, Value>) {
        self.trees.insert(locale.to_string(), tree);
    }

    pub fn has_leaf(&self, locale: &str, path: &str) -> bool {
        self.get_leaf(locale, path).is_some()
    }

    pub fn get_leaf(&self, locale: &str, path: &str) -> Option<&str> {
        let mut current = self.trees.get(locale)?;
        let segments: Vec<&str> = path.split('.').collect();
        let (last, parents) = segments.split_last()?;
        for segment in parents {
            current = current.get(*segment)?.as_object()?;
        }
        current.get(*last)?.as_str()
    }

    pub fn probe(&self, locale: &str, path: &str, value: &str) -> LeafProbe {
        let Some(tree) = self.trees.get(locale) else {
            return LeafProbe::Free;
        };
        probe_tree(tree, path, value)
    }

    /// Write a leaf. Writing the value a leaf already holds is a no-op; a
    /// different value is a `KeyCollision` unless `overwrite` is set.
    pub fn set_leaf(
        &mut self,
        locale: &str,
        path: &str,
        value: &str,
        overwrite: bool,
    ) -> Result<(), LiftError> {
        match self.probe(locale, path, value) {
            LeafProbe::Same => Ok(()),
            LeafProbe::Blocked(at) => Err(LiftError::StructuralConflict {
                locale: locale.to_string(),
                path: path.to_string(),
                at,
            }),
            LeafProbe::Different(existing) if !overwrite => Err(LiftError::KeyCollision {
                locale: locale.to_string(),
                path: path.to_string(),
                existing,
                incoming: value.to_string(),
            }),
            probe => {
                let tree = self.trees.entry(locale.to_string()).or_default();
                write_leaf(tree, path, value);
                self.dirty.insert(locale.to_string());
                if probe == LeafProbe::Free && locale == self.source_locale {
                    self.pending.push(path.to_string());
                }
                Ok(())
            }
        }
    }

    /// Source leaves added since the last flush, in insertion order.
    pub fn pending_new_keys(&self) -> &[String] {
        &self.pending
    }

    fn is_placeholder(&self, value: &str) -> bool {
        value.starts_with(&self.placeholder_prefix)
    }

    /// Give every target locale a value for each new source leaf: keep a real
    /// translation, refresh an existing placeholder, or insert one.
    pub fn propagate_new_keys(&mut self, source: &str, targets: &[String]) -> PropagationStats {
        let mut stats = PropagationStats::default();
        let new_keys = self.pending.clone();

        for target in targets.iter().filter(|t| t.as_str() != source) {
            for path in &new_keys {
                let Some(text) = self.get_leaf(source, path).map(str::to_string) else {
                    continue;
                };
                let placeholder = format!("{}{}", self.placeholder_prefix, text);

                match self.probe(target, path, &placeholder) {
                    LeafProbe::Same => stats.preserved += 1,
                    LeafProbe::Free => {
                        let tree = self.trees.entry(target.clone()).or_default();
                        write_leaf(tree, path, &placeholder);
                        self.dirty.insert(target.clone());
                        stats.inserted += 1;
                    }
                    LeafProbe::Different(existing) if self.is_placeholder(&existing) => {
                        let tree = self.trees.entry(target.clone()).or_default();
                        write_leaf(tree, path, &placeholder);
                        self.dirty.insert(target.clone());
                        stats.refreshed += 1;
                    }
                    LeafProbe::Different(_) => stats.preserved += 1,
                    LeafProbe::Blocked(at) => {
                        crate::logging::warn(&format!(
                            "Cannot add '{}' to locale '{}': conflicts with '{}'",
                            path, target, at
                        ));
                        stats.conflicts += 1;
                    }
                }
            }
        }

        stats
    }

    /// Serialize each changed locale back to disk, taking a backup of the
    /// previous document first. A locale whose backup or write fails is
    /// reported and stays dirty; the others are still written.
    pub fn flush<F: FileSystem>(
        &mut self,
        fs: &F,
        locales: &[String],
        backups: &Backups,
    ) -> FlushOutcome {
        let mut outcome = FlushOutcome::default();

        for locale in locales {
            if !self.dirty.contains(locale) {
                continue;
            }
            let path = self.locale_path(locale);

            if let Err(e) = backups.snapshot(fs, &path) {
                outcome
                    .failures
                    .push(LiftError::persistence(path.display(), format!("backup failed: {:#}", e)));
                continue;
            }

            let rendered = self.render(locale);
            match fs.write_atomic(&path, &rendered) {
                Ok(()) => {
                    self.dirty.remove(locale);
                    if *locale == self.source_locale {
                        self.pending.clear();
                    }
                    outcome.written.push(locale.clone());
                }
                Err(e) => outcome
                    .failures
                    .push(LiftError::persistence(path.display(), format!("{:#}", e))),
            }
        }

        outcome
    }

    pub fn render(&self, locale: &str) -> String {
        let empty = Map::new();
        let tree = self.trees.get(locale).unwrap_or(&empty);
        let style = self.styles.get(locale).cloned().unwrap_or_default();
        render_with_style(tree, &style)
    }

    pub fn is_dirty(&self, locale: &str) -> bool {
        self.dirty.contains(locale)
    }

    /// Every dotted leaf path in a locale's tree, sorted.
    pub fn leaf_paths(&self, locale: &str) -> Vec<String> {
        let mut paths = Vec::new();
        if let Some(tree) = self.trees.get(locale) {
            collect_leaf_paths(tree, "", &mut paths);
        }
        paths.sort();
        paths
    }
}

fn parse_locale_document(content: &str, path: &Path) -> Result<Map<String, Value>, LiftError> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(LiftError::persistence(
            path.display(),
            "locale document must be a JSON object",
        )),
        Err(e) => Err(LiftError::persistence(
            path.display(),
            format!("invalid JSON: {}", e),
        )),
    }
}

fn probe_tree(tree: &Map<String, Value>, path: &str, value: &str) -> LeafProbe {
    let segments: Vec<&str> = path.split('.').collect();
    let mut current = tree;

    for (i, segment) in segments.iter().enumerate() {
        let is_last = i == segments.len() - 1;
        match current.get(*segment) {
            None => return LeafProbe::Free,
            Some(Value::Object(nested)) if !is_last => current = nested,
            Some(Value::Object(_)) => return LeafProbe::Blocked(path.to_string()),
            Some(Value::String(existing)) if is_last => {
                return if existing == value {
                    LeafProbe::Same
                } else {
                    LeafProbe::Different(existing.clone())
                };
            }
            Some(other) if is_last => return LeafProbe::Different(other.to_string()),
            Some(_) => return LeafProbe::Blocked(segments[..=i].join(".")),
        }
    }

    LeafProbe::Free
}

/// Write a leaf, creating intermediate objects. Callers probe first, so
/// every intermediate segment is either missing or an object.
fn write_leaf(tree: &mut Map<String, Value>, path: &str, value: &str) {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = tree;
    for segment in parents {
        let entry = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        match entry {
            Value::Object(nested) => current = nested,
            _ => return,
        }
    }
    current.insert((*last).to_string(), Value::String(value.to_string()));
}

fn collect_leaf_paths(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => collect_leaf_paths(nested, &path, out),
            _ => out.push(path),
        }
    }
}
