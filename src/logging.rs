use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "error" => Some(Self::Error),
            "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            _ => None,
        }
    }
}

fn level_cell() -> &'static AtomicU8 {
    static CELL: OnceLock<AtomicU8> = OnceLock::new();
    CELL.get_or_init(|| AtomicU8::new(LogLevel::Info as u8))
}

pub fn set_level(level: LogLevel) {
    level_cell().store(level as u8, Ordering::Relaxed);
}

/// Resolve the effective level from `--log-level` and the verbose flag.
/// An explicit level wins; otherwise verbose means debug.
pub fn init(explicit: Option<&str>, verbose: bool) -> Result<LogLevel, String> {
    let level = match explicit {
        Some(value) => LogLevel::parse(value)
            .ok_or_else(|| format!("Unknown log level '{}' (expected error|warn|info|debug)", value))?,
        None if verbose => LogLevel::Debug,
        None => LogLevel::Info,
    };
    set_level(level);
    Ok(level)
}

pub fn enabled(level: LogLevel) -> bool {
    (level as u8) <= level_cell().load(Ordering::Relaxed)
}

pub fn error(message: &str) {
    if enabled(LogLevel::Error) {
        eprintln!("{} {}", "error:".bold().red(), message);
    }
}

pub fn warn(message: &str) {
    if enabled(LogLevel::Warn) {
        eprintln!("{} {}", "warning:".bold().yellow(), message);
    }
}

pub fn info(message: &str) {
    if enabled(LogLevel::Info) {
        println!("{}", message);
    }
}

pub fn debug(message: &str) {
    if enabled(LogLevel::Debug) {
        eprintln!("{} {}", "debug:".dimmed(), message);
    }
}
