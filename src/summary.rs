use crate::anomaly::{detect_anomalies, Anomaly, AnomalyThresholds};
use crate::config::EngineConfig;
use crate::engine::ParseResult;
use crate::patterns::PatternRecord;
use chrono::{DateTime, SecondsFormat, Timelike, Utc};
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub format_id: String,
    pub format_name: String,
    pub total_lines: usize,
    pub parsed_lines: usize,
    pub error_lines: usize,
    pub skipped_lines: usize,
    /// Parsed lines as a rounded percentage of all lines.
    pub success_rate: u32,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountItem {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub top: Vec<CountItem>,
    pub total_unique: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IpStats {
    pub unique_count: usize,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpStats {
    pub distribution: BTreeMap<u16, usize>,
    pub total_requests: usize,
}

/// Display-oriented digest of a parse run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub overview: Overview,
    pub levels: BTreeMap<String, usize>,
    /// Records per hour of day (UTC), 0..=23; untimestamped records are left out.
    pub hourly_activity: BTreeMap<u32, usize>,
    pub sources: SourceStats,
    pub ip_addresses: IpStats,
    pub http_status: HttpStats,
    pub top_patterns: Vec<PatternRecord>,
    pub anomalies: Vec<Anomaly>,
}

pub fn summarize(result: &ParseResult, config: &EngineConfig) -> AnalysisSummary {
    let entries = &result.entries;
    let stats = result.stats;

    let times: Vec<DateTime<Utc>> = entries
        .iter()
        .filter_map(|r| r.timestamp.as_deref())
        .filter_map(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc))
        .collect();
    let fmt = |t: &DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Millis, true);

    let success_rate = if stats.total_lines == 0 {
        0
    } else {
        (stats.parsed_lines as f64 / stats.total_lines as f64 * 100.0).round() as u32
    };
    let overview = Overview {
        format_id: result.format_id.clone(),
        format_name: result.format_name.clone(),
        total_lines: stats.total_lines,
        parsed_lines: stats.parsed_lines,
        error_lines: stats.error_lines,
        skipped_lines: stats.skipped_lines,
        success_rate,
        start_time: times.iter().min().map(fmt),
        end_time: times.iter().max().map(fmt),
    };

    let levels: BTreeMap<String, usize> = entries
        .iter()
        .map(|r| r.level.as_str().to_string())
        .counts()
        .into_iter()
        .collect();

    let mut hourly_activity: BTreeMap<u32, usize> = (0..24).map(|h| (h, 0)).collect();
    for t in &times {
        *hourly_activity.entry(t.hour()).or_insert(0) += 1;
    }

    let source_counts = entries.iter().filter_map(|r| r.source.as_deref()).counts();
    let total_unique = source_counts.len();
    let top = source_counts
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .take(config.top_sources)
        .map(|(name, count)| CountItem { name: name.to_string(), count })
        .collect();

    let unique_ips: Vec<&str> = entries.iter().filter_map(|r| r.ip_address.as_deref()).unique().collect();
    let ip_addresses = IpStats {
        unique_count: unique_ips.len(),
        samples: unique_ips.iter().take(config.ip_samples).map(|s| s.to_string()).collect(),
    };

    let statuses: Vec<u16> = entries.iter().filter_map(|r| r.status_code).collect();
    let http_status = HttpStats {
        total_requests: statuses.len(),
        distribution: statuses.into_iter().counts().into_iter().collect(),
    };

    let top_patterns = result
        .patterns
        .iter()
        .sorted_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.template.cmp(&b.template)))
        .take(config.top_patterns)
        .cloned()
        .collect();

    let anomalies = detect_anomalies(entries, &result.patterns, &AnomalyThresholds::from(config));

    AnalysisSummary {
        overview,
        levels,
        hourly_activity,
        sources: SourceStats { top, total_unique },
        ip_addresses,
        http_status,
        top_patterns,
        anomalies,
    }
}
