use thiserror::Error;

/// Errors raised by the extraction / rewrite pipeline.
///
/// Per-file and per-candidate variants are recovered by the batch and end up
/// in the run report; only `Setup` aborts a command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiftError {
    /// A single source file could not be parsed. The file is skipped.
    #[error("failed to parse {file}:{line}:{column}: {message}")]
    RecoverableParse {
        file: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// The recorded token is no longer present at its recorded position.
    #[error("{file}:{line}: expected {expected} but the source has changed")]
    CandidateDrift {
        file: String,
        line: usize,
        expected: String,
    },

    /// A leaf already holds a different value and overwrite was not requested.
    #[error("key '{path}' in locale '{locale}' already holds '{existing}' (refusing to write '{incoming}')")]
    KeyCollision {
        locale: String,
        path: String,
        existing: String,
        incoming: String,
    },

    /// The key path cannot exist in the tree as a leaf (a prefix is a leaf,
    /// or the path itself holds nested keys).
    #[error("key '{path}' in locale '{locale}' conflicts with the existing tree at '{at}'")]
    StructuralConflict {
        locale: String,
        path: String,
        at: String,
    },

    #[error("no free key found for '{path}' after {attempts} suffixes")]
    SuffixExhausted { path: String, attempts: usize },

    /// Reading or writing a locale document or source file failed.
    #[error("{path}: {message}")]
    Persistence { path: String, message: String },

    /// Missing or invalid required input. Fatal, raised before any mutation.
    #[error("{0}")]
    Setup(String),
}

impl LiftError {
    pub fn persistence(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        LiftError::Persistence {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Short machine-friendly tag used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            LiftError::RecoverableParse { .. } => "parse",
            LiftError::CandidateDrift { .. } => "drift",
            LiftError::KeyCollision { .. } => "collision",
            LiftError::StructuralConflict { .. } => "conflict",
            LiftError::SuffixExhausted { .. } => "suffix-exhausted",
            LiftError::Persistence { .. } => "persistence",
            LiftError::Setup(_) => "setup",
        }
    }

    /// The file, key path or locale document the error is about.
    pub fn subject(&self) -> String {
        match self {
            LiftError::RecoverableParse { file, .. } | LiftError::CandidateDrift { file, .. } => {
                file.clone()
            }
            LiftError::KeyCollision { locale, path, .. }
            | LiftError::StructuralConflict { locale, path, .. } => format!("{}:{}", locale, path),
            LiftError::SuffixExhausted { path, .. } | LiftError::Persistence { path, .. } => {
                path.clone()
            }
            LiftError::Setup(_) => String::new(),
        }
    }
}
