use crate::config::EngineConfig;
use crate::detector::{Detection, FormatDetector};
use crate::error::EngineError;
use crate::formats::{FormatDescriptor, FormatRegistry};
use crate::parser::{LineParser, ParsedRecord};
use crate::patterns::{PatternRecord, PatternTracker};
use crate::source::LineSource;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// Line accounting for one run. `total == parsed + errors + skipped` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseStats {
    pub total_lines: usize,
    pub parsed_lines: usize,
    pub error_lines: usize,
    pub skipped_lines: usize,
}

/// Mid-run counters handed to the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub processed: usize,
    pub parsed: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub format_id: String,
    pub format_name: String,
    pub stats: ParseStats,
    pub entries: Vec<ParsedRecord>,
    pub patterns: Vec<PatternRecord>,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<Detection>,
}

/// Drives detection, per-line parsing and pattern tracking for whole files.
///
/// An `Engine` holds only configuration, so one instance can serve many runs
/// (including concurrent ones); every run owns its own source, tracker and
/// result.
pub struct Engine {
    config: EngineConfig,
    registry: &'static FormatRegistry,
    cancel: Option<Arc<AtomicBool>>,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine { config, registry: FormatRegistry::builtin(), cancel: None }
    }

    /// Abort runs at the next line boundary once `flag` is raised.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &'static FormatRegistry {
        self.registry
    }

    pub fn detect(&self, path: impl AsRef<Path>) -> Result<Detection, EngineError> {
        FormatDetector::with_registry(self.registry, &self.config).detect(self.open(path.as_ref())?)
    }

    fn open(&self, path: &Path) -> Result<LineSource, EngineError> {
        let source = LineSource::open(path)?;
        Ok(match &self.cancel {
            Some(flag) => source.with_cancel_flag(flag.clone()),
            None => source,
        })
    }

    /// Look up `format_id`, or detect the format when none is given.
    pub fn resolve_format(
        &self,
        path: &Path,
        format_id: Option<&str>,
    ) -> Result<(FormatDescriptor, Option<Detection>), EngineError> {
        if let Some(id) = format_id {
            let d = self.registry.get(id).ok_or_else(|| EngineError::UnknownFormat(id.to_string()))?;
            return Ok((d.clone(), None));
        }
        let detection = self.detect(path)?;
        match detection.best_match.clone() {
            Some(d) => Ok((d, Some(detection))),
            None => Err(EngineError::NoConfidentFormat {
                path: path.to_path_buf(),
                best: detection.top_score().map(|s| (s.format_id.clone(), s.score)),
            }),
        }
    }

    /// Parse a whole file. Fatal problems (unsupported compression, no
    /// confident format, I/O failure, cancellation) abort the run; lines that
    /// fail to parse become error-flagged records and the run continues.
    pub fn parse(
        &self,
        path: impl AsRef<Path>,
        format_id: Option<&str>,
        on_progress: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<ParseResult, EngineError> {
        let path = path.as_ref();
        let (descriptor, detection) = self.resolve_format(path, format_id)?;
        let source = self.open(path)?;
        tracing::info!(path = %path.display(), format = %descriptor.id, "parsing file");
        let mut result = self.parse_lines(source, &descriptor, on_progress)?;
        result.detection = detection;
        Ok(result)
    }

    /// Parse an already-open line sequence with a known descriptor.
    pub fn parse_lines<I>(
        &self,
        lines: I,
        descriptor: &FormatDescriptor,
        mut on_progress: Option<&mut dyn FnMut(Progress)>,
    ) -> Result<ParseResult, EngineError>
    where
        I: IntoIterator<Item = Result<String, EngineError>>,
    {
        let started = Instant::now();
        let year = self.config.reference_year.unwrap_or_else(|| Utc::now().year());
        let parser = LineParser::new(descriptor).with_year(year);
        let interval = self.config.progress_interval.max(1);
        let mut stats = ParseStats::default();
        let mut entries = Vec::new();
        let mut tracker = PatternTracker::new(self.config.tracked_examples);

        for line in lines {
            let line = line?;
            stats.total_lines += 1;
            let line_number = stats.total_lines;
            if line.trim().is_empty() {
                stats.skipped_lines += 1;
            } else {
                match parser.parse_line(&line, line_number) {
                    Ok(rec) => {
                        stats.parsed_lines += 1;
                        tracker.track(&rec);
                        entries.push(rec);
                    }
                    Err(err) => {
                        tracing::trace!(line = line_number, error = %err, "line failed to parse");
                        stats.error_lines += 1;
                        entries.push(ParsedRecord::failed(line_number, &line, &err));
                    }
                }
            }
            if stats.total_lines % interval == 0 {
                if let Some(cb) = on_progress.as_deref_mut() {
                    cb(Progress {
                        processed: stats.total_lines,
                        parsed: stats.parsed_lines,
                        errors: stats.error_lines,
                    });
                }
            }
        }

        let patterns = tracker.into_patterns(self.config.public_examples);
        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            format = %descriptor.id,
            total = stats.total_lines,
            parsed = stats.parsed_lines,
            errors = stats.error_lines,
            skipped = stats.skipped_lines,
            patterns = patterns.len(),
            duration_ms,
            "parse run finished"
        );
        Ok(ParseResult {
            format_id: descriptor.id.clone(),
            format_name: descriptor.name.clone(),
            stats,
            entries,
            patterns,
            duration_ms,
            detection: None,
        })
    }
}
