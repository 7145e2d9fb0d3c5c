use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::formats::{delimiter_label, FormatDescriptor, FormatRegistry, MatchRule, DELIMITED_ID};
use crate::parser::split_fields;
use crate::source::LineSource;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Separators tried by the delimited hypothesis, in tie-break order.
pub const CANDIDATE_DELIMITERS: [char; 5] = [',', '\t', '|', ';', ' '];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatScore {
    pub format_id: String,
    pub format_name: String,
    pub score: f64,
    pub matches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_fields: Option<f64>,
}

/// Outcome of sampling a file and scoring every known format against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    #[serde(skip)]
    pub best_match: Option<FormatDescriptor>,
    pub best_format_id: Option<String>,
    pub confidence: Option<f64>,
    /// Scores in evaluation order: catalog order, then the delimited hypothesis.
    pub all_scores: Vec<FormatScore>,
    pub sample_preview: Vec<String>,
    pub sample_count: usize,
}

impl Detection {
    /// Highest-scoring candidate whether or not it cleared the floor.
    pub fn top_score(&self) -> Option<&FormatScore> {
        self.all_scores
            .iter()
            .fold(None, |best: Option<&FormatScore>, s| match best {
                Some(b) if b.score >= s.score => Some(b),
                _ => Some(s),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelimitedGuess {
    pub delimiter: char,
    pub consistency: f64,
    pub average_fields: f64,
    pub consistent_lines: usize,
}

pub struct FormatDetector<'r> {
    registry: &'r FormatRegistry,
    sample_size: usize,
    preview_lines: usize,
    confidence_floor: f64,
    delimiter_floor: f64,
}

impl FormatDetector<'static> {
    pub fn new(config: &EngineConfig) -> Self {
        FormatDetector::with_registry(FormatRegistry::builtin(), config)
    }
}

impl<'r> FormatDetector<'r> {
    pub fn with_registry(registry: &'r FormatRegistry, config: &EngineConfig) -> Self {
        FormatDetector {
            registry,
            sample_size: config.sample_size,
            preview_lines: config.preview_lines,
            confidence_floor: config.confidence_floor,
            delimiter_floor: config.delimiter_consistency_floor,
        }
    }

    pub fn detect_path(&self, path: impl AsRef<Path>) -> Result<Detection, EngineError> {
        self.detect(LineSource::open(path)?)
    }

    /// Pull up to `sample_size` non-blank lines from `lines` and score them.
    pub fn detect<I>(&self, lines: I) -> Result<Detection, EngineError>
    where
        I: IntoIterator<Item = Result<String, EngineError>>,
    {
        let mut samples = Vec::with_capacity(self.sample_size);
        for line in lines {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            samples.push(line);
            if samples.len() >= self.sample_size {
                break;
            }
        }
        Ok(self.detect_samples(&samples))
    }

    pub fn detect_samples(&self, samples: &[String]) -> Detection {
        let n = samples.len();
        let ratio = |m: usize| if n == 0 { 0.0 } else { m as f64 / n as f64 };
        let mut all_scores = Vec::with_capacity(self.registry.len() + 1);
        let mut best: Option<(usize, f64)> = None;
        let mut consider = |idx: usize, score: f64| {
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((idx, score));
            }
        };

        let mut candidates: Vec<FormatDescriptor> = Vec::new();
        for d in self.registry.iter() {
            let matches = match &d.rule {
                MatchRule::StructuredText { pattern } => samples.iter().filter(|l| pattern.is_match(l.trim_end())).count(),
                MatchRule::SemiStructured => samples.iter().filter(|l| is_json_object(l)).count(),
                // Catalog delimited entries are explicit choices; the hypothesis below covers detection.
                MatchRule::Delimited { .. } => continue,
            };
            let score = ratio(matches);
            tracing::debug!(format = %d.id, score, matches, "format score");
            consider(candidates.len(), score);
            candidates.push(d.clone());
            all_scores.push(FormatScore {
                format_id: d.id.clone(),
                format_name: d.name.clone(),
                score,
                matches,
                delimiter: None,
                average_fields: None,
            });
        }

        let mut hypothesis: Option<usize> = None;
        if let Some(guess) = delimited_hypothesis(samples) {
            let descriptor = FormatDescriptor::detected_delimited(guess.delimiter);
            tracing::debug!(delimiter = %delimiter_label(guess.delimiter), consistency = guess.consistency, "delimited hypothesis");
            consider(candidates.len(), guess.consistency);
            hypothesis = Some(candidates.len());
            all_scores.push(FormatScore {
                format_id: DELIMITED_ID.to_string(),
                format_name: descriptor.name.clone(),
                score: guess.consistency,
                matches: guess.consistent_lines,
                delimiter: Some(delimiter_label(guess.delimiter)),
                average_fields: Some(guess.average_fields),
            });
            candidates.push(descriptor);
        }

        // A winning delimited hypothesis must also clear the consistency floor.
        let accepted = best.filter(|&(idx, score)| {
            score >= self.confidence_floor && (Some(idx) != hypothesis || score >= self.delimiter_floor)
        });
        let best_match = accepted.map(|(idx, _)| candidates[idx].clone());
        match &best_match {
            Some(d) => tracing::info!(format = %d.id, samples = n, "detected log format"),
            None => tracing::warn!(samples = n, "no log format above confidence floor"),
        }
        Detection {
            best_format_id: best_match.as_ref().map(|d| d.id.clone()),
            confidence: accepted.map(|(_, s)| s),
            best_match,
            all_scores,
            sample_preview: samples.iter().take(self.preview_lines).cloned().collect(),
            sample_count: n,
        }
    }
}

/// A line qualifies as semi-structured when it is one complete JSON object.
pub fn is_json_object(line: &str) -> bool {
    matches!(serde_json::from_str::<Value>(line.trim()), Ok(Value::Object(_)))
}

/// Best delimiter by field-count consistency, among those averaging at least
/// three fields per line. A line is consistent when its field count lies
/// strictly within one of the rounded mean.
pub fn delimited_hypothesis(samples: &[String]) -> Option<DelimitedGuess> {
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mut best: Option<DelimitedGuess> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let counts: Vec<usize> = samples.iter().map(|l| split_fields(l, delimiter).len()).collect();
        let average_fields = counts.iter().sum::<usize>() as f64 / n;
        if average_fields < 3.0 {
            continue;
        }
        let target = average_fields.round();
        let consistent_lines = counts.iter().filter(|&&c| (c as f64 - target).abs() < 1.0).count();
        let consistency = consistent_lines as f64 / n;
        if best.map_or(true, |b| consistency > b.consistency) {
            best = Some(DelimitedGuess { delimiter, consistency, average_fields, consistent_lines });
        }
    }
    best
}
