use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::error::LiftError;
use crate::fs::{FileSystem, RealFileSystem};
use crate::report::{RunReport, REPORT_JSON, REPORT_MD};

/// Re-render the summary of the last run from `report.json`.
pub fn run(config: &Config, project_root: &Path) -> Result<()> {
    println!("=== i18n-lift report ===");

    let fs = RealFileSystem;
    let output_dir = project_root.join(&config.output_dir);
    if !fs.exists(&output_dir.join(REPORT_JSON)) {
        return Err(LiftError::Setup(format!(
            "No report at {} (run `i18n-lift extract` first)",
            output_dir.join(REPORT_JSON).display()
        ))
        .into());
    }

    let report = RunReport::load(&fs, &output_dir)?;
    println!("Generated: {}", report.generated_at);
    report.print_summary();

    if config.dry_run {
        println!("\n(dry run, {} not rewritten)", output_dir.join(REPORT_MD).display());
    } else {
        report.save(&fs, &output_dir)?;
        println!("\nReport: {}", output_dir.join(REPORT_MD).display());
    }

    println!("\nDone!");
    Ok(())
}
