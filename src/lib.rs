pub mod error;
pub mod config;
pub mod level;
pub mod timestamp;
pub mod formats;
pub mod source;
pub mod parser;
pub mod detector;
pub mod masking;
pub mod patterns;
pub mod engine;
pub mod anomaly;
pub mod summary;

pub use config::EngineConfig;
pub use engine::{Engine, ParseResult, ParseStats, Progress};
pub use error::EngineError;
pub use summary::{summarize, AnalysisSummary};
