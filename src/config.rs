use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["i18n-lift.json", "i18n-lift.json5"];

/// Configuration for i18n-lift
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directories to scan, relative to the project root (e.g., ["src"])
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,

    /// File extensions to scan, without the leading dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns excluded from the working set
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Minimum candidate length, in characters
    #[serde(default = "default_min_length")]
    pub min_length: usize,

    /// Maximum candidate length, in characters
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Regexes; a candidate matching any of them is never extracted
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Attributes whose values carry user-facing text
    #[serde(default = "default_attributes")]
    pub attributes: Vec<String>,

    /// Attributes whose values (and any expression inside them) are never extracted
    #[serde(default = "default_excluded_attributes")]
    pub excluded_attributes: Vec<String>,

    /// Names of existing translation-lookup functions (e.g., ["t"])
    #[serde(default = "default_translation_functions")]
    pub translation_functions: Vec<String>,

    /// Directory holding one `<locale>.json` document per locale
    #[serde(default = "default_messages_dir")]
    pub messages_dir: String,

    /// Locale whose tree holds the literal source text
    #[serde(default = "default_source_locale")]
    pub source_locale: String,

    /// Locales that receive placeholders for new keys
    #[serde(default)]
    pub target_locales: Vec<String>,

    /// Directory for the manifest, report, backups and run lock
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Namespace used when a file cannot be attributed to one
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Path segments skipped when inferring the namespace
    #[serde(default = "default_grouping_segments")]
    pub grouping_segments: Vec<String>,

    #[serde(default = "default_slug_max_words")]
    pub slug_max_words: usize,

    #[serde(default = "default_slug_max_chars")]
    pub slug_max_chars: usize,

    /// Prefix marking a target-locale value as "needs translation"
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,

    #[serde(default)]
    pub binding: BindingConfig,

    /// Optional formatter command; `{file}` is replaced by the file path.
    /// The new content is piped on stdin and read back from stdout.
    #[serde(default)]
    pub formatter: Option<Vec<String>>,

    #[serde(default)]
    pub dry_run: bool,

    #[serde(default = "default_true")]
    pub create_backups: bool,

    #[serde(default)]
    pub verbose: bool,
}

/// Names of the translation-lookup facility injected by `replace`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BindingConfig {
    /// Hook used in synchronous components
    #[serde(default = "default_hook")]
    pub hook: String,

    #[serde(default = "default_hook_source")]
    pub hook_source: String,

    /// Awaited function used in async (server) components
    #[serde(default = "default_server")]
    pub server: String,

    #[serde(default = "default_server_source")]
    pub server_source: String,
}

fn default_roots() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx"].iter().map(|s| s.to_string()).collect()
}

fn default_exclude() -> Vec<String> {
    [
        "**/node_modules/**",
        "**/*.d.ts",
        "**/*.test.*",
        "**/*.spec.*",
        "**/*.stories.*",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_length() -> usize {
    2
}

fn default_max_length() -> usize {
    120
}

fn default_attributes() -> Vec<String> {
    [
        "placeholder",
        "title",
        "alt",
        "aria-label",
        "aria-description",
        "label",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_excluded_attributes() -> Vec<String> {
    [
        "className",
        "class",
        "id",
        "style",
        "href",
        "src",
        "type",
        "name",
        "value",
        "key",
        "htmlFor",
        "role",
        "target",
        "rel",
        "variant",
        "data-testid",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_translation_functions() -> Vec<String> {
    vec!["t".to_string()]
}

fn default_messages_dir() -> String {
    "src/messages".to_string()
}

fn default_source_locale() -> String {
    "en".to_string()
}

fn default_output_dir() -> String {
    ".i18n-lift".to_string()
}

fn default_namespace() -> String {
    "common".to_string()
}

fn default_grouping_segments() -> Vec<String> {
    ["src", "app", "components", "features", "pages", "[locale]"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_slug_max_words() -> usize {
    4
}

fn default_slug_max_chars() -> usize {
    20
}

fn default_placeholder_prefix() -> String {
    "[TODO] ".to_string()
}

fn default_hook() -> String {
    "useTranslations".to_string()
}

fn default_hook_source() -> String {
    "next-intl".to_string()
}

fn default_server() -> String {
    "getTranslations".to_string()
}

fn default_server_source() -> String {
    "next-intl/server".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            hook: default_hook(),
            hook_source: default_hook_source(),
            server: default_server(),
            server_source: default_server_source(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: default_roots(),
            extensions: default_extensions(),
            exclude: default_exclude(),
            min_length: default_min_length(),
            max_length: default_max_length(),
            ignore_patterns: Vec::new(),
            attributes: default_attributes(),
            excluded_attributes: default_excluded_attributes(),
            translation_functions: default_translation_functions(),
            messages_dir: default_messages_dir(),
            source_locale: default_source_locale(),
            target_locales: Vec::new(),
            output_dir: default_output_dir(),
            default_namespace: default_namespace(),
            grouping_segments: default_grouping_segments(),
            slug_max_words: default_slug_max_words(),
            slug_max_chars: default_slug_max_chars(),
            placeholder_prefix: default_placeholder_prefix(),
            binding: BindingConfig::default(),
            formatter: None,
            dry_run: false,
            create_backups: true,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON (or JSON5, by extension) file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json5 = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json5"))
            .unwrap_or(false);

        let config: Config = if is_json5 {
            json5::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn from_json_string(json_str: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json_str)
            .with_context(|| "Failed to parse config JSON string")?;
        config.validate()?;
        Ok(config)
    }

    /// Load the explicit path, or the first default config file found in
    /// `project_root`, or fall back to the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>, project_root: &Path) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                for name in DEFAULT_CONFIG_FILES {
                    let candidate = project_root.join(name);
                    if candidate.exists() {
                        return Self::load(candidate);
                    }
                }
                Ok(Self::default())
            }
        }
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.min_length > self.max_length {
            bail!(
                "minLength ({}) must not exceed maxLength ({})",
                self.min_length,
                self.max_length
            );
        }
        if self.roots.is_empty() {
            bail!("At least one scan root is required");
        }
        if self.extensions.is_empty() {
            bail!("At least one file extension is required");
        }
        if self.slug_max_words == 0 || self.slug_max_chars == 0 {
            bail!("slugMaxWords and slugMaxChars must be positive");
        }
        if self.source_locale.trim().is_empty() {
            bail!("sourceLocale must not be empty");
        }
        if self.target_locales.contains(&self.source_locale) {
            bail!(
                "targetLocales must not contain the source locale '{}'",
                self.source_locale
            );
        }
        if self.placeholder_prefix.is_empty() {
            bail!("placeholderPrefix must not be empty");
        }
        if let Some(argv) = &self.formatter {
            if argv.is_empty() {
                bail!("formatter must name a program");
            }
        }
        self.compiled_ignore_patterns()?;
        for pattern in &self.exclude {
            glob::Pattern::new(pattern)
                .with_context(|| format!("Invalid exclude glob: {}", pattern))?;
        }
        Ok(())
    }

    pub fn compiled_ignore_patterns(&self) -> Result<Vec<Regex>> {
        self.ignore_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid ignore pattern: {}", p)))
            .collect()
    }

    /// Every locale managed by the Key Store, source first.
    pub fn all_locales(&self) -> Vec<String> {
        let mut locales = vec![self.source_locale.clone()];
        locales.extend(self.target_locales.iter().cloned());
        locales
    }
}
