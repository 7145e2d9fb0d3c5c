use crate::level::Level;
use crate::masking::generalize;
use crate::parser::ParsedRecord;
use ahash::AHashMap;
use chrono::{SecondsFormat, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// A recurring message shape and its occurrence statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternRecord {
    pub template: String,
    pub frequency: usize,
    pub first_seen: String,
    pub last_seen: String,
    pub severity: Level,
    pub examples: Vec<String>,
}

const ERROR_KEYWORDS: &[&str] = &["error", "fail", "exception", "critical", "fatal", "denied", "refused", "timeout"];
const WARNING_KEYWORDS: &[&str] = &["warning", "warn", "deprecated", "slow", "retry", "fallback"];

/// Keyword heuristic: error keywords win over warning keywords, otherwise info.
pub fn classify_template(template: &str) -> Level {
    let lower = template.to_lowercase();
    if ERROR_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Level::Error
    } else if WARNING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        Level::Warning
    } else {
        Level::Info
    }
}

const TEMPLATE_CACHE_SIZE: usize = 4096;

/// Per-run template table. Owns its state; one tracker per parse run.
pub struct PatternTracker {
    patterns: AHashMap<String, PatternRecord>,
    cache: LruCache<String, String>,
    max_examples: usize,
}

impl Default for PatternTracker {
    fn default() -> Self {
        PatternTracker::new(5)
    }
}

impl PatternTracker {
    pub fn new(max_examples: usize) -> Self {
        PatternTracker {
            patterns: AHashMap::new(),
            cache: LruCache::new(NonZeroUsize::new(TEMPLATE_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN)),
            max_examples: max_examples.max(1),
        }
    }

    fn template_for(&mut self, message: &str) -> String {
        if let Some(t) = self.cache.get(message) {
            return t.clone();
        }
        let t = generalize(message);
        self.cache.put(message.to_string(), t.clone());
        t
    }

    /// Fold one record into the table. Records with an empty message are ignored.
    pub fn track(&mut self, record: &ParsedRecord) {
        if record.message.is_empty() {
            return;
        }
        let template = self.template_for(&record.message);
        let seen = record
            .timestamp
            .clone()
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        match self.patterns.get_mut(&template) {
            Some(p) => {
                p.frequency += 1;
                p.last_seen = seen;
                if p.examples.len() < self.max_examples {
                    p.examples.push(record.message.clone());
                }
            }
            None => {
                let severity = classify_template(&template);
                self.patterns.insert(
                    template.clone(),
                    PatternRecord {
                        template,
                        frequency: 1,
                        first_seen: seen.clone(),
                        last_seen: seen,
                        severity,
                        examples: vec![record.message.clone()],
                    },
                );
            }
        }
    }

    pub fn get(&self, template: &str) -> Option<&PatternRecord> {
        self.patterns.get(template)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Consume the tracker into a list sorted by frequency (desc) then template,
    /// keeping at most `examples` examples per pattern.
    pub fn into_patterns(self, examples: usize) -> Vec<PatternRecord> {
        let mut out: Vec<PatternRecord> = self
            .patterns
            .into_values()
            .map(|mut p| {
                p.examples.truncate(examples);
                p
            })
            .collect();
        out.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.template.cmp(&b.template)));
        out
    }
}
