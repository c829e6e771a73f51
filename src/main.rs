use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use i18n_lift::cancel::CancelToken;
use i18n_lift::commands;
use i18n_lift::config::Config;
use i18n_lift::logging;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "i18n-lift")]
#[command(author, version, about = "Lift hardcoded UI text into translation dictionaries", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Compute everything, write nothing
    #[arg(long, global = true)]
    dry_run: bool,

    /// Do not keep backups of overwritten files
    #[arg(long, global = true)]
    no_backup: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// error, warn, info or debug
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Stop picking up new files after this many seconds
    #[arg(long, global = true)]
    deadline: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan sources, derive keys and write them to the locale dictionaries
    Extract {
        /// Where to write the manifest (defaults to <outputDir>/manifest.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Rewrite sources to use translation lookups, driven by the manifest
    Replace {
        /// Manifest to read (defaults to <outputDir>/manifest.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },

    /// Show the summary of the last run without re-scanning
    Report,

    /// Create a default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(short, long)]
        force: bool,

        /// Scan roots (comma-separated)
        #[arg(long)]
        roots: Option<String>,

        /// Locale holding the source text
        #[arg(long)]
        source_locale: Option<String>,

        /// Locales receiving placeholders (comma-separated)
        #[arg(long)]
        target_locales: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_root = std::env::current_dir().context("Failed to resolve the working directory")?;

    if let Commands::Init {
        force,
        roots,
        source_locale,
        target_locales,
    } = &cli.command
    {
        logging::init(cli.log_level.as_deref(), cli.verbose).map_err(anyhow::Error::msg)?;
        return commands::init::run(
            &project_root,
            *force,
            roots.as_deref(),
            source_locale.as_deref(),
            target_locales.as_deref(),
        );
    }

    // Load configuration; CLI flags win over config flags
    let mut config = Config::load_or_default(cli.config.as_ref(), &project_root)?;
    config.dry_run |= cli.dry_run;
    config.verbose |= cli.verbose;
    if cli.no_backup {
        config.create_backups = false;
    }
    logging::init(cli.log_level.as_deref(), config.verbose).map_err(anyhow::Error::msg)?;

    let cancel = CancelToken::new();
    if let Some(seconds) = cli.deadline {
        cancel.cancel_after(Duration::from_secs(seconds));
    }

    match cli.command {
        Commands::Extract { manifest } => {
            commands::extract::run(&config, &project_root, manifest.as_deref(), cancel)?;
        }
        Commands::Replace { manifest } => {
            commands::replace::run(&config, &project_root, manifest.as_deref(), cancel)?;
        }
        Commands::Report => {
            commands::report::run(&config, &project_root)?;
        }
        Commands::Init { .. } => {}
    }

    Ok(())
}
