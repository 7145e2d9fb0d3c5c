use crate::config::EngineConfig;
use crate::level::Level;
use crate::parser::ParsedRecord;
use crate::patterns::PatternRecord;
use ahash::AHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    HighErrorRate,
    SuspiciousIpActivity,
    FrequentErrorPattern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    /// Share of error-like records above which the error rate is flagged.
    pub error_rate: f64,
    /// An IP is suspicious above this multiple of the mean per-IP request count.
    pub ip_multiplier: f64,
    /// Error patterns seen more often than this are flagged.
    pub error_pattern_min: usize,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        AnomalyThresholds::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for AnomalyThresholds {
    fn from(c: &EngineConfig) -> Self {
        AnomalyThresholds {
            error_rate: c.error_rate_threshold,
            ip_multiplier: c.suspicious_ip_multiplier,
            error_pattern_min: c.frequent_error_pattern_min,
        }
    }
}

/// Evaluate every rule independently; results are ordered error before warning before info.
pub fn detect_anomalies(entries: &[ParsedRecord], patterns: &[PatternRecord], t: &AnomalyThresholds) -> Vec<Anomaly> {
    let mut out = Vec::new();
    out.extend(high_error_rate(entries, t.error_rate));
    out.extend(suspicious_ips(entries, t.ip_multiplier));
    out.extend(frequent_error_patterns(patterns, t.error_pattern_min));
    out.sort_by_key(|a| a.severity);
    out
}

fn high_error_rate(entries: &[ParsedRecord], threshold: f64) -> Option<Anomaly> {
    let total = entries.len();
    if total == 0 {
        return None;
    }
    let errors = entries.iter().filter(|r| r.level.is_error_like()).count();
    let rate = errors as f64 / total as f64;
    if rate <= threshold {
        return None;
    }
    let percentage = (rate * 10_000.0).round() / 100.0;
    Some(Anomaly {
        kind: AnomalyKind::HighErrorRate,
        severity: Level::Warning,
        message: format!("High error rate: {errors} of {total} records ({percentage}%) are errors"),
        count: Some(errors),
        percentage: Some(percentage),
        ip: None,
        template: None,
    })
}

fn suspicious_ips(entries: &[ParsedRecord], multiplier: f64) -> Vec<Anomaly> {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    for ip in entries.iter().filter_map(|r| r.ip_address.as_deref()) {
        *counts.entry(ip).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Vec::new();
    }
    let distinct = counts.len() as f64;
    let total: usize = counts.values().sum();
    let mean = total as f64 / distinct;
    // count > multiplier * total / distinct, kept free of the division.
    let mut flagged: Vec<(&str, usize)> = counts
        .into_iter()
        .filter(|(_, c)| *c as f64 * distinct > multiplier * total as f64)
        .collect();
    flagged.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    flagged
        .into_iter()
        .map(|(ip, count)| Anomaly {
            kind: AnomalyKind::SuspiciousIpActivity,
            severity: Level::Error,
            message: format!("Suspicious activity from {ip}: {count} requests (mean {mean:.2} per address)"),
            count: Some(count),
            percentage: None,
            ip: Some(ip.to_string()),
            template: None,
        })
        .collect()
}

fn frequent_error_patterns(patterns: &[PatternRecord], min: usize) -> Vec<Anomaly> {
    patterns
        .iter()
        .filter(|p| p.severity == Level::Error && p.frequency > min)
        .map(|p| Anomaly {
            kind: AnomalyKind::FrequentErrorPattern,
            severity: Level::Warning,
            message: format!("Error pattern repeated {} times: {}", p.frequency, p.template),
            count: Some(p.frequency),
            percentage: None,
            ip: None,
            template: Some(p.template.clone()),
        })
        .collect()
}
