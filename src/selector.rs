use anyhow::{Context, Result};
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// One file of the working set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated
    pub relative: String,
    /// Path relative to the scan root that contained it, `/`-separated
    pub within_root: String,
    pub absolute: PathBuf,
}

/// Resolve the working set: every file under the configured roots whose
/// extension is allowed and which matches no exclusion glob. Sorted by
/// relative path; a file reachable from two roots appears once.
pub fn select_files(project_root: &Path, config: &Config) -> Result<Vec<SourceFile>> {
    let excludes = compile_excludes(&config.exclude)?;
    let mut files = Vec::new();

    for root in &config.roots {
        let root_path = project_root.join(root);
        if !root_path.is_dir() {
            crate::logging::warn(&format!(
                "Scan root {} does not exist, skipping",
                root_path.display()
            ));
            continue;
        }

        for entry in WalkDir::new(&root_path).follow_links(false) {
            let entry = entry.with_context(|| format!("Failed to walk {}", root_path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !has_allowed_extension(path, &config.extensions) {
                continue;
            }

            let relative = to_slash(path.strip_prefix(project_root).unwrap_or(path));
            if is_excluded(&relative, &excludes) {
                continue;
            }
            let within_root = to_slash(path.strip_prefix(&root_path).unwrap_or(path));

            files.push(SourceFile {
                relative,
                within_root,
                absolute: path.to_path_buf(),
            });
        }
    }

    files.sort();
    files.dedup_by(|a, b| a.relative == b.relative);
    Ok(files)
}

fn compile_excludes(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude glob: {}", p)))
        .collect()
}

fn is_excluded(relative: &str, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|p| p.matches(relative))
}

fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.trim_start_matches('.') == ext))
        .unwrap_or(false)
}

pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export {}\n").unwrap();
    }

    #[test]
    fn test_select_filters_extensions_and_excludes() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/app/page.tsx");
        touch(dir.path(), "src/lib/util.ts");
        touch(dir.path(), "src/lib/types.d.ts");
        touch(dir.path(), "src/lib/util.test.ts");
        touch(dir.path(), "src/styles/site.css");
        touch(dir.path(), "src/node_modules/pkg/index.js");
        touch(dir.path(), "scripts/build.ts");

        let files = select_files(dir.path(), &Config::default()).unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["src/app/page.tsx", "src/lib/util.ts"]);
        assert_eq!(files[0].within_root, "app/page.tsx");
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            roots: vec!["nope".to_string()],
            ..Config::default()
        };
        assert!(select_files(dir.path(), &config).unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_roots_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/app/page.tsx");
        let config = Config {
            roots: vec!["src".to_string(), "src/app".to_string()],
            ..Config::default()
        };
        let files = select_files(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
    }
}
