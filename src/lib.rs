//! Extract hardcoded UI text from React / Next.js sources into per-locale
//! JSON dictionaries, then rewrite the sources to call translation lookups.
//!
//! `extract` runs selector → scanner → filter → keys → store and writes a
//! manifest; `replace` reads the manifest and drives the rewriter.

pub mod cancel;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod fs;
pub mod keys;
pub mod logging;
pub mod manifest;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod rewriter;
pub mod scanner;
pub mod selector;
pub mod store;

pub use config::Config;
pub use error::LiftError;
pub use pipeline::{ExtractOutcome, Pipeline, ReplaceOutcome};
