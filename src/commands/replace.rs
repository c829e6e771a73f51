use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::fs::RealFileSystem;
use crate::pipeline::Pipeline;

pub fn run(
    config: &Config,
    project_root: &Path,
    manifest: Option<&Path>,
    cancel: CancelToken,
) -> Result<()> {
    println!("=== i18n-lift replace ===\n");

    let fs = RealFileSystem;
    let pipeline = Pipeline::new(&fs, config, project_root).with_cancel(cancel);

    println!("Configuration:");
    println!("  Manifest: {}", pipeline.manifest_path(manifest).display());
    println!(
        "  Binding: {} ({}), {} ({})",
        config.binding.hook,
        config.binding.hook_source,
        config.binding.server,
        config.binding.server_source
    );
    if let Some(formatter) = &config.formatter {
        println!("  Formatter: {}", formatter.join(" "));
    }
    if config.dry_run {
        println!("  Mode: {}", "dry run".cyan());
    }
    println!();

    let outcome = pipeline.replace(manifest)?;

    if outcome.rewrites.is_empty() {
        println!("Nothing to rewrite.");
    } else {
        println!("Rewritten files:");
        println!("{}", "-".repeat(60));
        let verb = if config.dry_run { "would rewrite" } else { "rewrote" };
        for rewrite in &outcome.rewrites {
            println!(
                "  {} - {} {} string(s)",
                rewrite.file, verb, rewrite.applied
            );
            if !rewrite.accessors_added.is_empty() {
                crate::logging::debug(&format!(
                    "{}: declared {}",
                    rewrite.file,
                    rewrite.accessors_added.join(", ")
                ));
            }
        }
        println!("{}", "-".repeat(60));
    }

    outcome.report.print_summary();

    println!("\nDone!");
    Ok(())
}
