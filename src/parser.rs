use crate::formats::{FormatDescriptor, MatchRule};
use crate::level::{normalize_level, Level};
use crate::timestamp::normalize_timestamp_with_year;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Instant;
use thiserror::Error;

/// One input line's outcome. Field names are part of the storage contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRecord {
    pub line_number: usize,
    pub raw_line: String,
    pub timestamp: Option<String>,
    pub level: Level,
    pub message: String,
    pub source: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status_code: Option<u16>,
    pub response_size: Option<u64>,
    /// Milliseconds spent parsing this line.
    pub processing_time: f64,
    pub parsed_fields: Map<String, Value>,
    pub error: Option<String>,
}

impl ParsedRecord {
    fn empty(line_number: usize, raw_line: &str) -> Self {
        ParsedRecord {
            line_number,
            raw_line: raw_line.to_string(),
            timestamp: None,
            level: Level::Info,
            message: String::new(),
            source: None,
            ip_address: None,
            user_agent: None,
            status_code: None,
            response_size: None,
            processing_time: 0.0,
            parsed_fields: Map::new(),
            error: None,
        }
    }

    /// Error-flagged record for a line that could not be parsed.
    pub fn failed(line_number: usize, raw_line: &str, err: &ParseError) -> Self {
        let mut rec = ParsedRecord::empty(line_number, raw_line);
        rec.message = raw_line.to_string();
        rec.level = Level::Unknown;
        rec.error = Some(err.to_string());
        rec
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Recoverable, per-line failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line does not match format '{format}'")]
    PatternMismatch { format: String },
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    #[error("JSON value is not an object")]
    NotAnObject,
    #[error("delimiter '{delimiter}' not found in line")]
    MissingDelimiter { delimiter: String },
    #[error("format '{format}' has no delimiter; run detection or pick a concrete format")]
    NoDelimiter { format: String },
}

struct Aliases {
    timestamp: &'static [&'static str],
    level: &'static [&'static str],
    message: &'static [&'static str],
    source: &'static [&'static str],
}

const JSON_ALIASES: Aliases = Aliases {
    timestamp: &["timestamp", "@timestamp", "time", "date"],
    level: &["level", "severity", "priority", "loglevel"],
    message: &["message", "msg", "content", "log"],
    source: &["source", "logger", "service", "application"],
};

const DELIMITED_ALIASES: Aliases = Aliases {
    timestamp: &["timestamp", "time", "date"],
    level: &["level", "severity"],
    message: &["message", "msg"],
    source: &["source", "hostname", "service", "logger"],
};

const TEXT_ALIASES: Aliases = Aliases {
    timestamp: &["timestamp"],
    level: &["level"],
    message: &["message", "request"],
    source: &["hostname", "server", "process", "logger", "app_name"],
};

const IP_KEYS: &[&str] = &["ip", "client_ip", "remote_addr"];
const STATUS_KEYS: &[&str] = &["status", "status_code"];
const SIZE_KEYS: &[&str] = &["size", "bytes"];

/// Parses raw lines with one descriptor.
#[derive(Debug, Clone)]
pub struct LineParser<'a> {
    descriptor: &'a FormatDescriptor,
    year: i32,
}

impl<'a> LineParser<'a> {
    pub fn new(descriptor: &'a FormatDescriptor) -> Self {
        Self { descriptor, year: Utc::now().year() }
    }

    /// Year assumed for timestamps that omit it (syslog).
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn descriptor(&self) -> &FormatDescriptor {
        self.descriptor
    }

    pub fn parse_line(&self, raw: &str, line_number: usize) -> Result<ParsedRecord, ParseError> {
        let started = Instant::now();
        let mut rec = match &self.descriptor.rule {
            MatchRule::SemiStructured => self.parse_json(raw, line_number)?,
            MatchRule::Delimited { delimiter } => self.parse_delimited(raw, *delimiter, line_number)?,
            MatchRule::StructuredText { pattern } => self.parse_text(raw, pattern, line_number)?,
        };
        rec.processing_time = started.elapsed().as_secs_f64() * 1000.0;
        Ok(rec)
    }

    fn parse_json(&self, raw: &str, line_number: usize) -> Result<ParsedRecord, ParseError> {
        let value: Value = serde_json::from_str(raw.trim()).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        let Value::Object(fields) = value else {
            return Err(ParseError::NotAnObject);
        };
        let mut rec = ParsedRecord::empty(line_number, raw);
        rec.parsed_fields = fields;
        self.promote(&mut rec, &JSON_ALIASES);
        Ok(rec)
    }

    fn parse_delimited(&self, raw: &str, delimiter: Option<char>, line_number: usize) -> Result<ParsedRecord, ParseError> {
        let delimiter = delimiter.ok_or_else(|| ParseError::NoDelimiter { format: self.descriptor.id.clone() })?;
        let values = split_fields(raw, delimiter);
        if values.len() < 2 {
            return Err(ParseError::MissingDelimiter { delimiter: crate::formats::delimiter_label(delimiter) });
        }
        let mut rec = ParsedRecord::empty(line_number, raw);
        for (idx, v) in values.iter().enumerate() {
            let name = match self.descriptor.fields.get(idx) {
                Some(n) => n.clone(),
                None => format!("field_{}", idx + 1),
            };
            rec.parsed_fields.insert(name, Value::String(v.to_string()));
        }
        self.promote(&mut rec, &DELIMITED_ALIASES);
        Ok(rec)
    }

    fn parse_text(&self, raw: &str, pattern: &regex::Regex, line_number: usize) -> Result<ParsedRecord, ParseError> {
        let caps = pattern
            .captures(raw.trim_end())
            .ok_or_else(|| ParseError::PatternMismatch { format: self.descriptor.id.clone() })?;
        let mut rec = ParsedRecord::empty(line_number, raw);
        for (idx, name) in self.descriptor.fields.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                rec.parsed_fields.insert(name.clone(), Value::String(m.as_str().to_string()));
            }
        }
        self.promote(&mut rec, &TEXT_ALIASES);
        Ok(rec)
    }

    /// Copy recognized fields onto the named record attributes.
    fn promote(&self, rec: &mut ParsedRecord, aliases: &Aliases) {
        let fields = &rec.parsed_fields;
        rec.timestamp = pick(fields, aliases.timestamp).and_then(|t| normalize_timestamp_with_year(&t, self.year));

        let level_raw = pick(fields, aliases.level);
        let pri = fields.get("pri").and_then(value_text).and_then(|p| p.parse::<u16>().ok());
        rec.level = match (level_raw, pri) {
            (Some(l), _) => normalize_level(Some(&l)),
            (None, Some(p)) => Level::from_syslog_code((p % 8) as u8).unwrap_or_default(),
            (None, None) => Level::Info,
        };

        rec.message = pick(fields, aliases.message).unwrap_or_else(|| rec.raw_line.trim().to_string());
        rec.source = pick(fields, aliases.source).filter(|s| is_present(s));
        rec.ip_address = pick(fields, IP_KEYS).filter(|s| is_present(s));
        rec.user_agent = pick(fields, &["user_agent"]).filter(|s| is_present(s));
        rec.status_code = pick(fields, STATUS_KEYS).and_then(|s| s.trim().parse().ok());
        rec.response_size = pick(fields, SIZE_KEYS).and_then(|s| s.trim().parse().ok());

        if let Some(p) = pri {
            rec.parsed_fields.insert("facility".to_string(), Value::from(p / 8));
        }
    }
}

/// Parse one line with `descriptor`, assuming the current year for yearless timestamps.
pub fn parse_line(raw: &str, descriptor: &FormatDescriptor, line_number: usize) -> Result<ParsedRecord, ParseError> {
    LineParser::new(descriptor).parse_line(raw, line_number)
}

/// Split a delimited line. Space splits on runs of spaces; other delimiters are
/// literal. Surrounding whitespace and double quotes are stripped from values.
pub fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    if delimiter == ' ' {
        return line.split(' ').filter(|s| !s.is_empty()).collect();
    }
    line.split(delimiter)
        .map(|s| {
            let s = s.trim();
            s.strip_prefix('"').and_then(|t| t.strip_suffix('"')).unwrap_or(s)
        })
        .collect()
}

fn pick(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| fields.get(*k).and_then(value_text))
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn is_present(s: &str) -> bool {
    let t = s.trim();
    !t.is_empty() && t != "-"
}
