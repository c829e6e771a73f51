use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::fs::RealFileSystem;
use crate::keys::KeyStatus;
use crate::pipeline::Pipeline;

pub fn run(
    config: &Config,
    project_root: &Path,
    manifest: Option<&Path>,
    cancel: CancelToken,
) -> Result<()> {
    println!("=== i18n-lift extract ===\n");

    println!("Configuration:");
    println!("  Roots: {:?}", config.roots);
    println!("  Extensions: {:?}", config.extensions);
    println!("  Messages: {}", config.messages_dir);
    println!("  Locales: {:?}", config.all_locales());
    if config.dry_run {
        println!("  Mode: {}", "dry run".cyan());
    }
    println!();

    let fs = RealFileSystem;
    let pipeline = Pipeline::new(&fs, config, project_root).with_cancel(cancel);
    let outcome = pipeline.extract(manifest)?;

    if outcome.manifest.is_empty() {
        println!("No hardcoded text found.");
    } else {
        println!("Extracted keys by file:");
        println!("{}", "-".repeat(60));

        for (file, entries) in outcome.manifest.by_file() {
            println!("\n{}", file);
            for entry in entries {
                let marker = match entry.status {
                    KeyStatus::New => "+".green(),
                    KeyStatus::Reused => "=".dimmed(),
                };
                println!(
                    "  {} {:<40} {:?}",
                    marker, entry.suggested_key, entry.candidate.text
                );
            }
        }

        println!("\n{}", "-".repeat(60));
    }

    outcome.report.print_summary();

    if config.dry_run {
        let pending = outcome.store.pending_new_keys();
        if !pending.is_empty() {
            println!(
                "\nWould add {} key(s) to {}",
                pending.len(),
                outcome.store.locale_path(&config.source_locale).display()
            );
        }
    } else {
        if let Some(stats) = &outcome.report.extract {
            for locale in &stats.locales_written {
                println!(
                    "  Wrote {}",
                    outcome.store.locale_path(locale).display()
                );
            }
        }
        println!("\nManifest: {}", outcome.manifest_path.display());
        println!("Report: {}", pipeline.output_dir().join(crate::report::REPORT_MD).display());
    }

    println!("\nDone!");
    Ok(())
}
