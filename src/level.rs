use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized severity. `Unknown` is reserved for lines that failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    Info,
    Debug,
    Unknown,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Emergency => "emergency",
            Level::Alert => "alert",
            Level::Critical => "critical",
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Notice => "notice",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Unknown => "unknown",
        }
    }

    /// Syslog severity code 0..=7.
    pub fn from_syslog_code(code: u8) -> Option<Level> {
        SYSLOG_CODES.get(code as usize).copied()
    }

    pub fn is_error_like(&self) -> bool {
        matches!(self, Level::Error | Level::Critical | Level::Emergency)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SYSLOG_CODES: [Level; 8] = [
    Level::Emergency,
    Level::Alert,
    Level::Critical,
    Level::Error,
    Level::Warning,
    Level::Notice,
    Level::Info,
    Level::Debug,
];

// Lowercased token -> level. Abbreviations outside this table (e.g. "err") fall back to info.
const LEVEL_TABLE: &[(&str, Level)] = &[
    ("emergency", Level::Emergency),
    ("emerg", Level::Emergency),
    ("panic", Level::Emergency),
    ("alert", Level::Alert),
    ("critical", Level::Critical),
    ("crit", Level::Critical),
    ("fatal", Level::Critical),
    ("f", Level::Critical),
    ("error", Level::Error),
    ("e", Level::Error),
    ("warning", Level::Warning),
    ("warn", Level::Warning),
    ("w", Level::Warning),
    ("notice", Level::Notice),
    ("info", Level::Info),
    ("information", Level::Info),
    ("informational", Level::Info),
    ("i", Level::Info),
    ("debug", Level::Debug),
    ("trace", Level::Debug),
    ("d", Level::Debug),
];

/// Map a raw level token onto [`Level`]. Accepts words (any case) and syslog
/// numeric codes 0..=7; anything else, including absence, is `Info`.
pub fn normalize_level(raw: Option<&str>) -> Level {
    let Some(raw) = raw else { return Level::Info };
    let token = raw.trim().to_ascii_lowercase();
    if token.len() == 1 {
        if let Some(code) = token.bytes().next().filter(u8::is_ascii_digit) {
            return Level::from_syslog_code(code - b'0').unwrap_or(Level::Info);
        }
    }
    LEVEL_TABLE
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, level)| *level)
        .unwrap_or(Level::Info)
}
