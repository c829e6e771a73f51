use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::LiftError;
use crate::fs::FileSystem;
use crate::rewriter::SkippedCandidate;
use crate::store::PropagationStats;

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";

/// How many files the "top files" tables list.
pub const TOP_FILES: usize = 10;

/// A recovered per-file, per-key or per-locale error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub subject: String,
    pub kind: String,
    pub message: String,
}

impl From<&LiftError> for Failure {
    fn from(err: &LiftError) -> Self {
        Self {
            subject: err.subject(),
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCounts {
    /// Candidates that survived filtering
    pub candidates: usize,
    pub already_translated: usize,
    pub newly_extracted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractStats {
    pub files_scanned: usize,
    pub parse_failures: Vec<Failure>,
    /// Raw candidates before filtering
    pub candidates_found: usize,
    pub rejected: BTreeMap<String, usize>,
    pub already_translated: usize,
    pub reused: usize,
    pub newly_extracted: usize,
    pub collisions_resolved: usize,
    pub key_failures: Vec<Failure>,
    pub propagation: PropagationStats,
    pub locales_written: Vec<String>,
    pub locale_failures: Vec<Failure>,
    pub by_namespace: BTreeMap<String, usize>,
    pub by_file: BTreeMap<String, FileCounts>,
    /// Files left unprocessed because the run was cancelled
    pub not_processed: Vec<String>,
}

impl ExtractStats {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Files with the most accepted candidates, ties broken by path.
    pub fn top_files(&self, limit: usize) -> Vec<(&str, &FileCounts)> {
        let mut files: Vec<(&str, &FileCounts)> = self
            .by_file
            .iter()
            .filter(|(_, counts)| counts.candidates > 0)
            .map(|(file, counts)| (file.as_str(), counts))
            .collect();
        files.sort_by(|a, b| b.1.candidates.cmp(&a.1.candidates).then(a.0.cmp(b.0)));
        files.truncate(limit);
        files
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceStats {
    pub files_rewritten: Vec<String>,
    pub files_unchanged: usize,
    pub files_failed: Vec<Failure>,
    pub replacements_applied: usize,
    pub skipped: Vec<SkippedCandidate>,
    pub imports_added: usize,
    pub accessors_added: usize,
    pub not_processed: Vec<String>,
}

impl ReplaceStats {
    pub fn skipped_by_reason(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for skip in &self.skipped {
            *counts.entry(skip.reason.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Summary of the last `extract` and `replace` runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub generated_at: String,
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace: Option<ReplaceStats>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            generated_at: chrono::Local::now().to_rfc3339(),
            dry_run,
            extract: None,
            replace: None,
        }
    }

    pub fn load<F: FileSystem>(fs: &F, output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(REPORT_JSON);
        let content = fs
            .read_to_string(&path)
            .with_context(|| format!("Failed to read report: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse report: {}", path.display()))
    }

    /// Previous report if one can be read, otherwise `None`.
    pub fn load_existing<F: FileSystem>(fs: &F, output_dir: &Path) -> Option<Self> {
        if !fs.exists(&output_dir.join(REPORT_JSON)) {
            return None;
        }
        match Self::load(fs, output_dir) {
            Ok(report) => Some(report),
            Err(e) => {
                crate::logging::warn(&format!("Ignoring previous report: {:#}", e));
                None
            }
        }
    }

    /// Write `report.json` and `report.md`.
    pub fn save<F: FileSystem>(&self, fs: &F, output_dir: &Path) -> Result<()> {
        let json_path = output_dir.join(REPORT_JSON);
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        fs.write_atomic(&json_path, &json)
            .with_context(|| format!("Failed to write report: {}", json_path.display()))?;

        let md_path = output_dir.join(REPORT_MD);
        fs.write_atomic(&md_path, &self.to_markdown())
            .with_context(|| format!("Failed to write report: {}", md_path.display()))?;
        Ok(())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# i18n-lift report\n");
        let _ = writeln!(out, "Generated: {}", self.generated_at);
        if self.dry_run {
            let _ = writeln!(out, "\n> Dry run: nothing was written.");
        }

        if let Some(extract) = &self.extract {
            let _ = writeln!(out, "\n## Extract\n");
            let _ = writeln!(out, "| Metric | Count |");
            let _ = writeln!(out, "| --- | ---: |");
            for (label, value) in [
                ("Files scanned", extract.files_scanned),
                ("Parse failures", extract.parse_failures.len()),
                ("Candidates found", extract.candidates_found),
                ("Rejected", extract.rejected_total()),
                ("Already translated", extract.already_translated),
                ("Reused keys", extract.reused),
                ("Newly extracted", extract.newly_extracted),
                ("Collisions resolved", extract.collisions_resolved),
                ("Placeholders inserted", extract.propagation.inserted),
                ("Placeholders refreshed", extract.propagation.refreshed),
            ] {
                let _ = writeln!(out, "| {} | {} |", label, value);
            }

            if !extract.rejected.is_empty() {
                let _ = writeln!(out, "\n### Rejected by reason\n");
                for (reason, count) in &extract.rejected {
                    let _ = writeln!(out, "- `{}`: {}", reason, count);
                }
            }

            if !extract.by_namespace.is_empty() {
                let _ = writeln!(out, "\n### By namespace\n");
                let _ = writeln!(out, "| Namespace | Keys |");
                let _ = writeln!(out, "| --- | ---: |");
                for (namespace, count) in &extract.by_namespace {
                    let _ = writeln!(out, "| {} | {} |", namespace, count);
                }
            }

            let top = extract.top_files(TOP_FILES);
            if !top.is_empty() {
                let _ = writeln!(out, "\n### Top files\n");
                let _ = writeln!(out, "| File | Candidates | Already translated | New |");
                let _ = writeln!(out, "| --- | ---: | ---: | ---: |");
                for (file, counts) in top {
                    let _ = writeln!(
                        out,
                        "| {} | {} | {} | {} |",
                        file, counts.candidates, counts.already_translated, counts.newly_extracted
                    );
                }
            }

            write_failures(&mut out, "Parse failures", &extract.parse_failures);
            write_failures(&mut out, "Key failures", &extract.key_failures);
            write_failures(&mut out, "Locale failures", &extract.locale_failures);
            write_not_processed(&mut out, &extract.not_processed);
        }

        if let Some(replace) = &self.replace {
            let _ = writeln!(out, "\n## Replace\n");
            let _ = writeln!(out, "| Metric | Count |");
            let _ = writeln!(out, "| --- | ---: |");
            for (label, value) in [
                ("Files rewritten", replace.files_rewritten.len()),
                ("Files unchanged", replace.files_unchanged),
                ("Files failed", replace.files_failed.len()),
                ("Replacements applied", replace.replacements_applied),
                ("Skipped", replace.skipped.len()),
                ("Imports added", replace.imports_added),
                ("Accessors added", replace.accessors_added),
            ] {
                let _ = writeln!(out, "| {} | {} |", label, value);
            }

            if !replace.skipped.is_empty() {
                let _ = writeln!(out, "\n### Skipped\n");
                for skip in &replace.skipped {
                    let _ = writeln!(
                        out,
                        "- `{}` {}:{}:{} `{}` ({})",
                        skip.reason.as_str(),
                        skip.file,
                        skip.line,
                        skip.column,
                        skip.key,
                        skip.text
                    );
                }
            }

            write_failures(&mut out, "Failed files", &replace.files_failed);
            write_not_processed(&mut out, &replace.not_processed);
        }

        out
    }

    pub fn print_summary(&self) {
        if let Some(extract) = &self.extract {
            println!("\n{}", "Extraction Summary:".bold());
            println!("  Files scanned: {}", extract.files_scanned);
            println!("  Candidates found: {}", extract.candidates_found);
            println!("  Rejected: {}", extract.rejected_total());
            println!("  Already translated: {}", extract.already_translated);
            println!("  Reused keys: {}", extract.reused);
            println!(
                "  Newly extracted: {}",
                extract.newly_extracted.to_string().green()
            );
            if extract.collisions_resolved > 0 {
                println!("  Collisions resolved: {}", extract.collisions_resolved);
            }
            if extract.propagation.inserted + extract.propagation.refreshed > 0 {
                println!(
                    "  Placeholders: {} inserted, {} refreshed",
                    extract.propagation.inserted, extract.propagation.refreshed
                );
            }
            print_failure_count("Parse failures", extract.parse_failures.len());
            print_failure_count("Key failures", extract.key_failures.len());
            print_failure_count("Locale failures", extract.locale_failures.len());
            print_failure_count("Files not processed", extract.not_processed.len());

            let top = extract.top_files(TOP_FILES);
            if !top.is_empty() {
                println!("\n{}", "Top files:".bold());
                for (file, counts) in top {
                    println!("  {:>4}  {}", counts.candidates, file);
                }
            }
        }

        if let Some(replace) = &self.replace {
            println!("\n{}", "Replace Summary:".bold());
            println!(
                "  Files rewritten: {}",
                replace.files_rewritten.len().to_string().green()
            );
            println!("  Files unchanged: {}", replace.files_unchanged);
            println!("  Replacements applied: {}", replace.replacements_applied);
            println!(
                "  Imports added: {}, accessors added: {}",
                replace.imports_added, replace.accessors_added
            );
            for (reason, count) in replace.skipped_by_reason() {
                println!("  Skipped ({}): {}", reason, count.to_string().yellow());
            }
            print_failure_count("Files failed", replace.files_failed.len());
            print_failure_count("Files not processed", replace.not_processed.len());
        }

        if self.dry_run {
            println!("\n{}", "Dry run: no files were written.".cyan());
        }
    }
}

fn print_failure_count(label: &str, count: usize) {
    if count > 0 {
        println!("  {}: {}", label, count.to_string().red());
    }
}

fn write_failures(out: &mut String, title: &str, failures: &[Failure]) {
    if failures.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n### {}\n", title);
    for failure in failures {
        let _ = writeln!(out, "- `{}` {}", failure.kind, failure.message);
    }
}

fn write_not_processed(out: &mut String, files: &[String]) {
    if files.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n### Not processed (cancelled)\n");
    for file in files {
        let _ = writeln!(out, "- {}", file);
    }
}
