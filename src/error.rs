use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole parse run. Per-line problems never surface here;
/// they become error-flagged records instead (see [`crate::parser::ParseError`]).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{path}: unsupported compression '{kind}' (only gzip is supported)")]
    UnsupportedCompression { path: PathBuf, kind: String },

    #[error("{path}: could not detect log format with enough confidence{}", best_hint(.best))]
    NoConfidentFormat {
        path: PathBuf,
        best: Option<(String, f64)>,
    },

    #[error("unknown format id '{0}'")]
    UnknownFormat(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse run cancelled")]
    Cancelled,

    #[error("invalid configuration ({path}): {reason}")]
    Config { path: String, reason: String },
}

fn best_hint(best: &Option<(String, f64)>) -> String {
    match best {
        Some((id, score)) => format!(" (best candidate '{id}' scored {:.2}); pass an explicit format id", score),
        None => "; pass an explicit format id".to_string(),
    }
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io { path: path.into(), source }
    }
}
