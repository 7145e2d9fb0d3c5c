use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for detection, parsing and summarizing. Defaults match the
/// behaviour the engine has always shipped with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Non-blank lines sampled for format detection.
    pub sample_size: usize,
    /// Lines returned in the detection preview.
    pub preview_lines: usize,
    /// Minimum score for a detected format to be accepted.
    pub confidence_floor: f64,
    /// Minimum field-count consistency for the delimited hypothesis.
    pub delimiter_consistency_floor: f64,
    /// Progress callback cadence, in lines.
    pub progress_interval: usize,
    /// Examples retained per pattern while tracking.
    pub tracked_examples: usize,
    /// Examples exposed per pattern in a parse result.
    pub public_examples: usize,
    /// Year assumed for syslog timestamps that carry none; current UTC year when unset.
    pub reference_year: Option<i32>,
    pub top_sources: usize,
    pub ip_samples: usize,
    pub top_patterns: usize,
    pub error_rate_threshold: f64,
    pub suspicious_ip_multiplier: f64,
    pub frequent_error_pattern_min: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_size: 50,
            preview_lines: 10,
            confidence_floor: 0.70,
            delimiter_consistency_floor: 0.80,
            progress_interval: 1000,
            tracked_examples: 5,
            public_examples: 3,
            reference_year: None,
            top_sources: 10,
            ip_samples: 20,
            top_patterns: 20,
            error_rate_threshold: 0.10,
            suspicious_ip_multiplier: 10.0,
            frequent_error_pattern_min: 100,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let cfg: EngineConfig = serde_json::from_str(&text).map_err(|e| EngineError::Config {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        cfg.validate().map_err(|e| match e {
            EngineError::Config { reason, .. } => EngineError::Config { path: path.display().to_string(), reason },
            other => other,
        })?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |reason: &str| EngineError::Config { path: "<config>".into(), reason: reason.into() };
        if self.sample_size == 0 {
            return Err(bad("sample_size must be at least 1"));
        }
        if self.progress_interval == 0 {
            return Err(bad("progress_interval must be at least 1"));
        }
        for (name, v) in [
            ("confidence_floor", self.confidence_floor),
            ("delimiter_consistency_floor", self.delimiter_consistency_floor),
            ("error_rate_threshold", self.error_rate_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(bad(&format!("{name} must be within 0.0..=1.0, got {v}")));
            }
        }
        if self.suspicious_ip_multiplier <= 0.0 {
            return Err(bad("suspicious_ip_multiplier must be positive"));
        }
        Ok(())
    }
}
