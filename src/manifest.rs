use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

use crate::fs::FileSystem;
use crate::keys::KeyedCandidate;

pub const MANIFEST_FILE: &str = "manifest.json";

/// The reviewed hand-off between `extract` and `replace`: a JSON array of
/// keyed candidates, ordered by file and position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub entries: Vec<KeyedCandidate>,
}

impl Manifest {
    pub fn new(mut entries: Vec<KeyedCandidate>) -> Self {
        entries.sort_by(|a, b| {
            (&a.candidate.file, a.candidate.line, a.candidate.column).cmp(&(
                &b.candidate.file,
                b.candidate.line,
                b.candidate.column,
            ))
        });
        Self { entries }
    }

    pub fn load<F: FileSystem>(fs: &F, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let entries: Vec<KeyedCandidate> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest: {}", path.display()))?;
        Ok(Self::new(entries))
    }

    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&self.entries)?;
        json.push('\n');
        Ok(json)
    }

    pub fn save<F: FileSystem>(&self, fs: &F, path: &Path) -> Result<()> {
        fs.write_atomic(path, &self.to_json()?)
            .with_context(|| format!("Failed to write manifest: {}", path.display()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries grouped per file, in file order.
    pub fn by_file(&self) -> BTreeMap<&str, Vec<&KeyedCandidate>> {
        let mut grouped: BTreeMap<&str, Vec<&KeyedCandidate>> = BTreeMap::new();
        for entry in &self.entries {
            grouped
                .entry(entry.candidate.file.as_str())
                .or_default()
                .push(entry);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::InMemoryFileSystem;
    use crate::keys::KeyStatus;
    use crate::scanner::{Candidate, SyntacticContext};

    fn entry(file: &str, line: usize, text: &str) -> KeyedCandidate {
        KeyedCandidate {
            candidate: Candidate {
                text: text.to_string(),
                raw: format!("'{}'", text),
                file: file.to_string(),
                line,
                column: 5,
                syntactic_context: SyntacticContext::StringLiteral,
                attribute: None,
                surrounding_context: String::new(),
            },
            suggested_key: format!("common.page.{}", text.to_lowercase()),
            namespace: "common".to_string(),
            status: KeyStatus::New,
        }
    }

    #[test]
    fn test_manifest_is_flat_camel_case_array() {
        let manifest = Manifest::new(vec![entry("src/b.tsx", 1, "Bye"), entry("src/a.tsx", 2, "Hi")]);
        let json = manifest.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["file"], "src/a.tsx");
        assert_eq!(first["syntacticContext"], "StringLiteral");
        assert_eq!(first["suggestedKey"], "common.page.hi");
        assert_eq!(first["status"], "new");
        assert!(first.get("attribute").is_none());
    }

    #[test]
    fn test_save_and_load() {
        let fs = InMemoryFileSystem::new();
        let manifest = Manifest::new(vec![entry("src/a.tsx", 2, "Hi"), entry("src/a.tsx", 1, "Yo")]);
        let path = Path::new(".i18n-lift/manifest.json");
        manifest.save(&fs, path).unwrap();

        let loaded = Manifest::load(&fs, path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(loaded.by_file()["src/a.tsx"].len(), 2);
        assert_eq!(loaded.entries[0].candidate.line, 1);
    }

    #[test]
    fn test_load_missing_manifest_fails() {
        let fs = InMemoryFileSystem::new();
        assert!(Manifest::load(&fs, Path::new("nope.json")).is_err());
    }
}
