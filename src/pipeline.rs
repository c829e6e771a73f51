use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::LiftError;
use crate::filter::CandidateFilter;
use crate::formatter::Formatter;
use crate::fs::{Backups, FileSystem, RunLock};
use crate::keys::{KeyDeriver, KeyStatus, KeyedCandidate};
use crate::manifest::{Manifest, MANIFEST_FILE};
use crate::report::{ExtractStats, Failure, FileCounts, ReplaceStats, RunReport};
use crate::rewriter::{FileRewrite, Rewriter};
use crate::scanner::{scan_source, Occurrence, ScanOptions};
use crate::selector::{select_files, SourceFile};
use crate::store::KeyStore;

/// Result of scanning one file on a worker thread.
enum FileScan {
    Scanned {
        file: SourceFile,
        occurrences: Vec<Occurrence>,
    },
    Failed(LiftError),
    NotProcessed(String),
}

/// Result of rewriting one file on a worker thread.
enum FileOutcome {
    Rewritten(FileRewrite),
    Unchanged(FileRewrite),
    Failed(LiftError),
    NotProcessed(String),
}

pub struct ExtractOutcome {
    pub report: RunReport,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    /// The dictionaries as they are (or, in a dry run, would be) on disk
    pub store: KeyStore,
}

pub struct ReplaceOutcome {
    pub report: RunReport,
    /// Files with at least one edit, with their new content
    pub rewrites: Vec<FileRewrite>,
}

/// Orchestrates `extract` and `replace` over one project.
pub struct Pipeline<'a, F: FileSystem> {
    fs: &'a F,
    config: &'a Config,
    project_root: PathBuf,
    cancel: CancelToken,
}

impl<'a, F: FileSystem> Pipeline<'a, F> {
    pub fn new(fs: &'a F, config: &'a Config, project_root: &Path) -> Self {
        Self {
            fs,
            config,
            project_root: project_root.to_path_buf(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project_root.join(&self.config.output_dir)
    }

    pub fn manifest_path(&self, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) => self.project_root.join(path),
            None => self.output_dir().join(MANIFEST_FILE),
        }
    }

    fn key_store(&self) -> KeyStore {
        KeyStore::new(self.project_root.join(&self.config.messages_dir), self.config)
    }

    fn backups(&self) -> Backups {
        Backups::new(
            &self.project_root,
            self.output_dir().join("backups"),
            Backups::timestamp(),
            self.config.create_backups,
        )
    }

    /// Scan, filter and key every candidate in the working set, write new
    /// keys to the source locale and placeholders to the target locales,
    /// then persist the manifest and report. A dry run computes the same
    /// outcome and writes nothing.
    pub fn extract(&self, manifest_override: Option<&Path>) -> Result<ExtractOutcome> {
        let files = select_files(&self.project_root, self.config)?;
        let filter = CandidateFilter::from_config(self.config)?;
        let options = ScanOptions::from_config(self.config);
        let locales = self.config.all_locales();

        let _lock = if self.config.dry_run {
            None
        } else {
            Some(RunLock::acquire(&self.output_dir())?)
        };

        let mut store = self.key_store();
        store
            .seed_from_disk(self.fs, &locales)
            .map_err(|e| LiftError::Setup(format!("Cannot load locale documents: {}", e)))?;

        crate::logging::debug(&format!("Scanning {} file(s)", files.len()));
        let scans: Vec<FileScan> = files
            .into_par_iter()
            .map(|file| self.scan_file(file, &options))
            .collect();

        let deriver = KeyDeriver::new(self.config);
        let mut stats = ExtractStats::default();
        let mut entries: Vec<KeyedCandidate> = Vec::new();

        for scan in scans {
            let (file, occurrences) = match scan {
                FileScan::Scanned { file, occurrences } => (file, occurrences),
                FileScan::Failed(err) => {
                    crate::logging::warn(&err.to_string());
                    stats.parse_failures.push(Failure::from(&err));
                    continue;
                }
                FileScan::NotProcessed(file) => {
                    stats.not_processed.push(file);
                    continue;
                }
            };
            stats.files_scanned += 1;

            let mut counts = FileCounts::default();
            let mut candidates = Vec::new();
            for occurrence in occurrences {
                match occurrence {
                    Occurrence::Candidate(candidate) => candidates.push(candidate),
                    Occurrence::Translated { .. } => counts.already_translated += 1,
                }
            }
            stats.candidates_found += candidates.len();
            stats.already_translated += counts.already_translated;

            let outcome = filter.partition(candidates);
            for rejection in &outcome.rejected {
                crate::logging::debug(&format!(
                    "{}:{}:{} rejected ({}): {:?}",
                    rejection.candidate.file,
                    rejection.candidate.line,
                    rejection.candidate.column,
                    rejection.reason.as_str(),
                    rejection.candidate.text
                ));
                *stats
                    .rejected
                    .entry(rejection.reason.as_str().to_string())
                    .or_insert(0) += 1;
            }
            counts.candidates = outcome.accepted.len();

            for candidate in outcome.accepted {
                match deriver.derive(&file.within_root, candidate, &mut store) {
                    Ok(derived) => {
                        if derived.suffixed {
                            stats.collisions_resolved += 1;
                        }
                        match derived.entry.status {
                            KeyStatus::New => {
                                stats.newly_extracted += 1;
                                counts.newly_extracted += 1;
                            }
                            KeyStatus::Reused => stats.reused += 1,
                        }
                        *stats
                            .by_namespace
                            .entry(derived.entry.namespace.clone())
                            .or_insert(0) += 1;
                        entries.push(derived.entry);
                    }
                    Err(err) => {
                        crate::logging::warn(&err.to_string());
                        stats.key_failures.push(Failure::from(&err));
                    }
                }
            }

            stats.by_file.insert(file.relative, counts);
        }

        stats.propagation =
            store.propagate_new_keys(&self.config.source_locale, &self.config.target_locales);

        let manifest = Manifest::new(entries);
        let manifest_path = self.manifest_path(manifest_override);
        let mut report = RunReport::new(self.config.dry_run);

        if !self.config.dry_run {
            let flushed = store.flush(self.fs, &locales, &self.backups());
            for failure in &flushed.failures {
                crate::logging::error(&failure.to_string());
            }
            stats.locales_written = flushed.written;
            stats.locale_failures = flushed.failures.iter().map(Failure::from).collect();

            manifest.save(self.fs, &manifest_path)?;
            report.extract = Some(stats);
            report.save(self.fs, &self.output_dir())?;
        } else {
            report.extract = Some(stats);
        }

        Ok(ExtractOutcome {
            report,
            manifest,
            manifest_path,
            store,
        })
    }

    fn scan_file(&self, file: SourceFile, options: &ScanOptions) -> FileScan {
        if self.cancel.is_cancelled() {
            return FileScan::NotProcessed(file.relative);
        }
        let content = match self.fs.read_to_string(&file.absolute) {
            Ok(content) => content,
            Err(e) => return FileScan::Failed(LiftError::persistence(&file.relative, format!("{:#}", e))),
        };
        match scan_source(&content, &file.relative, options) {
            Ok(occurrences) => FileScan::Scanned { file, occurrences },
            Err(err) => FileScan::Failed(err),
        }
    }

    /// Rewrite every file named in the manifest. Each file is either fully
    /// rewritten or left exactly as it was; the replace section is merged
    /// into the existing report.
    pub fn replace(&self, manifest: Option<&Path>) -> Result<ReplaceOutcome> {
        let manifest_path = self.manifest_path(manifest);
        if !self.fs.exists(&manifest_path) {
            return Err(LiftError::Setup(format!(
                "No manifest at {} (run `i18n-lift extract` first)",
                manifest_path.display()
            ))
            .into());
        }
        let manifest = Manifest::load(self.fs, &manifest_path)?;

        let _lock = if self.config.dry_run {
            None
        } else {
            Some(RunLock::acquire(&self.output_dir())?)
        };

        let mut store = self.key_store();
        let source = vec![self.config.source_locale.clone()];
        store
            .seed_from_disk(self.fs, &source)
            .map_err(|e| LiftError::Setup(format!("Cannot load the source locale: {}", e)))?;

        let rewriter = Rewriter::new(self.config);
        let formatter = Formatter::from_argv(self.config.formatter.as_deref());
        let backups = self.backups();
        let groups: Vec<(&str, Vec<&KeyedCandidate>)> = manifest.by_file().into_iter().collect();

        let outcomes: Vec<FileOutcome> = groups
            .par_iter()
            .map(|(file, entries)| {
                self.rewrite_file(file, entries, &rewriter, formatter.as_ref(), &store, &backups)
            })
            .collect();

        let mut stats = ReplaceStats::default();
        let mut rewrites = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Rewritten(rewrite) => {
                    stats.replacements_applied += rewrite.applied;
                    stats.imports_added += usize::from(rewrite.import_added);
                    stats.accessors_added += rewrite.accessors_added.len();
                    stats.skipped.extend(rewrite.skipped.iter().cloned());
                    stats.files_rewritten.push(rewrite.file.clone());
                    rewrites.push(rewrite);
                }
                FileOutcome::Unchanged(rewrite) => {
                    stats.files_unchanged += 1;
                    stats.skipped.extend(rewrite.skipped);
                }
                FileOutcome::Failed(err) => {
                    crate::logging::error(&err.to_string());
                    stats.files_failed.push(Failure::from(&err));
                }
                FileOutcome::NotProcessed(file) => stats.not_processed.push(file),
            }
        }

        let output_dir = self.output_dir();
        let mut report = RunReport::load_existing(self.fs, &output_dir)
            .unwrap_or_else(|| RunReport::new(self.config.dry_run));
        report.generated_at = RunReport::new(self.config.dry_run).generated_at;
        report.dry_run = self.config.dry_run;
        report.replace = Some(stats);

        if !self.config.dry_run {
            report
                .save(self.fs, &output_dir)
                .context("Failed to write the run report")?;
        }

        Ok(ReplaceOutcome { report, rewrites })
    }

    fn rewrite_file(
        &self,
        file: &str,
        entries: &[&KeyedCandidate],
        rewriter: &Rewriter<'_>,
        formatter: Option<&Formatter>,
        store: &KeyStore,
        backups: &Backups,
    ) -> FileOutcome {
        if self.cancel.is_cancelled() {
            return FileOutcome::NotProcessed(file.to_string());
        }
        let path = self.project_root.join(file);
        let content = match self.fs.read_to_string(&path) {
            Ok(content) => content,
            Err(e) => return FileOutcome::Failed(LiftError::persistence(file, format!("{:#}", e))),
        };

        let mut rewrite = match rewriter.rewrite_source(file, &content, entries, store) {
            Ok(rewrite) => rewrite,
            Err(err) => return FileOutcome::Failed(err),
        };
        for skip in &rewrite.skipped {
            match skip.drift_error() {
                Some(err) => crate::logging::warn(&err.to_string()),
                None => crate::logging::debug(&format!(
                    "{}:{}:{} skipped ({}): {}",
                    skip.file,
                    skip.line,
                    skip.column,
                    skip.reason.as_str(),
                    skip.key
                )),
            }
        }
        if !rewrite.changed() {
            return FileOutcome::Unchanged(rewrite);
        }

        if let Some(formatter) = formatter {
            rewrite.content = formatter.format_or_keep(file, std::mem::take(&mut rewrite.content));
        }

        if !self.config.dry_run {
            if let Err(e) = backups.snapshot(self.fs, &path) {
                return FileOutcome::Failed(LiftError::persistence(
                    file,
                    format!("backup failed: {:#}", e),
                ));
            }
            if let Err(e) = self.fs.write_atomic(&path, &rewrite.content) {
                return FileOutcome::Failed(LiftError::persistence(file, format!("{:#}", e)));
            }
        }

        FileOutcome::Rewritten(rewrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::RealFileSystem;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        dir
    }

    #[test]
    fn test_replace_without_manifest_is_setup_error() {
        let dir = project(&[]);
        let config = Config::default();
        let fs = RealFileSystem;
        let err = Pipeline::new(&fs, &config, dir.path())
            .replace(None)
            .err()
            .unwrap();
        let lift = err.downcast_ref::<LiftError>().unwrap();
        assert_eq!(lift.kind(), "setup");
    }

    #[test]
    fn test_corrupt_locale_aborts_extract() {
        let dir = project(&[
            ("src/app/wallet/page.tsx", "export function Page() {\n  return <p>Withdraw funds</p>;\n}\n"),
            ("src/messages/en.json", "{ not json"),
        ]);
        let config = Config::default();
        let fs = RealFileSystem;
        assert!(Pipeline::new(&fs, &config, dir.path()).extract(None).is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/messages/en.json")).unwrap(),
            "{ not json"
        );
        assert!(!dir.path().join(".i18n-lift/manifest.json").exists());
        assert!(!dir.path().join(".i18n-lift/report.json").exists());
    }

    #[test]
    fn test_locked_extract_fails_before_reading_locales() {
        let dir = project(&[
            ("src/app/wallet/page.tsx", "export function Page() {\n  return <p>Withdraw funds</p>;\n}\n"),
            ("src/messages/en.json", "{ not json"),
        ]);
        let config = Config::default();
        let fs = RealFileSystem;
        let pipeline = Pipeline::new(&fs, &config, dir.path());
        let held = RunLock::acquire(&pipeline.output_dir()).unwrap();

        // The lock is checked before the locale documents are read, so the
        // corrupt en.json is never reached.
        let err = pipeline.extract(None).err().unwrap();
        assert!(format!("{:#}", err).contains("Another i18n-lift run"));
        assert!(err.downcast_ref::<LiftError>().is_none());
        assert!(!dir.path().join(".i18n-lift/manifest.json").exists());

        drop(held);
        let err = pipeline.extract(None).err().unwrap();
        assert_eq!(err.downcast_ref::<LiftError>().unwrap().kind(), "setup");
    }

    #[test]
    fn test_cancelled_run_processes_nothing() {
        let dir = project(&[(
            "src/app/wallet/page.tsx",
            "export function Page() {\n  return <p>Withdraw funds</p>;\n}\n",
        )]);
        let config = Config {
            dry_run: true,
            ..Config::default()
        };
        let fs = RealFileSystem;
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = Pipeline::new(&fs, &config, dir.path())
            .with_cancel(cancel)
            .extract(None)
            .unwrap();
        let stats = outcome.report.extract.unwrap();
        assert_eq!(stats.files_scanned, 0);
        assert_eq!(stats.not_processed, vec!["src/app/wallet/page.tsx"]);
        assert!(outcome.manifest.is_empty());
    }
}
