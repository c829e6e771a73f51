use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::config::{Config, DEFAULT_CONFIG_FILES};

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn run(
    project_root: &Path,
    force: bool,
    roots: Option<&str>,
    source_locale: Option<&str>,
    target_locales: Option<&str>,
) -> Result<()> {
    println!("=== i18n-lift init ===\n");

    let config_path = project_root.join(DEFAULT_CONFIG_FILES[0]);
    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let mut config = Config::default();
    if let Some(roots) = roots {
        config.roots = split_list(roots);
    }
    if let Some(locale) = source_locale {
        config.source_locale = locale.trim().to_string();
    }
    if let Some(targets) = target_locales {
        config.target_locales = split_list(targets);
    }
    config.validate()?;

    let config_str = serde_json::to_string_pretty(&config)?;
    std::fs::write(&config_path, format!("{}\n", config_str))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created configuration file: {}\n", config_path.display());
    println!("Configuration:");
    println!("  Roots: {:?}", config.roots);
    println!("  Messages: {}", config.messages_dir);
    println!("  Source locale: {}", config.source_locale);
    println!("  Target locales: {:?}", config.target_locales);

    let messages_dir = project_root.join(&config.messages_dir);
    let source_doc = messages_dir.join(format!("{}.json", config.source_locale));
    if !source_doc.exists() {
        std::fs::create_dir_all(&messages_dir)
            .with_context(|| format!("Failed to create {}", messages_dir.display()))?;
        std::fs::write(&source_doc, "{}\n")
            .with_context(|| format!("Failed to write {}", source_doc.display()))?;
        println!("\nCreated: {}", source_doc.display());
    }

    println!("\nNext steps:");
    println!("  1. Run 'i18n-lift extract --dry-run' to preview the keys");
    println!("  2. Run 'i18n-lift extract' and review the manifest");
    println!("  3. Run 'i18n-lift replace' to rewrite the sources");

    println!("\nDone!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_config_and_source_locale() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), false, Some("src, app"), Some("fr"), Some("en,de")).unwrap();

        let config = Config::load(dir.path().join("i18n-lift.json")).unwrap();
        assert_eq!(config.roots, vec!["src", "app"]);
        assert_eq!(config.source_locale, "fr");
        assert_eq!(config.target_locales, vec!["en", "de"]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("src/messages/fr.json")).unwrap(),
            "{}\n"
        );
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("i18n-lift.json"), "{}").unwrap();
        assert!(run(dir.path(), false, None, None, None).is_err());
        assert!(run(dir.path(), true, None, None, None).is_ok());
    }

    #[test]
    fn test_init_rejects_source_in_targets() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path(), false, None, Some("en"), Some("en,fr")).is_err());
        assert!(!dir.path().join("i18n-lift.json").exists());
    }
}
