use logsieve::formats::FormatRegistry;
use logsieve::level::Level;
use logsieve::parser::{parse_line, ParsedRecord};
use logsieve::patterns::{classify_template, PatternTracker};
use serde_json::json;

fn record(n: usize, message: &str, ts: &str) -> ParsedRecord {
    let json = FormatRegistry::builtin().get("json").unwrap();
    let line = json!({ "timestamp": ts, "message": message }).to_string();
    parse_line(&line, json, n).unwrap()
}

#[test]
fn same_shape_messages_share_a_template() {
    let mut tracker = PatternTracker::new(5);
    for i in 0..7 {
        let msg = format!("Connection from 10.0.0.{i} failed after {} ms", i * 10);
        tracker.track(&record(i + 1, &msg, &format!("2024-01-15T10:3{i}:00Z")));
    }
    tracker.track(&record(8, "Server started", "2024-01-15T11:00:00Z"));
    assert_eq!(tracker.len(), 2);

    let p = tracker.get("Connection from IP_ADDRESS failed after NUMBER ms").unwrap();
    assert_eq!(p.frequency, 7);
    assert_eq!(p.first_seen, "2024-01-15T10:30:00.000Z");
    assert_eq!(p.last_seen, "2024-01-15T10:36:00.000Z");
    assert_eq!(p.examples.len(), 5);
    assert_eq!(p.examples[0], "Connection from 10.0.0.0 failed after 0 ms");
    assert_eq!(p.severity, Level::Error);
}

#[test]
fn into_patterns_orders_by_frequency_and_trims_examples() {
    let mut tracker = PatternTracker::new(5);
    for i in 0..4 {
        tracker.track(&record(i, &format!("user {i} logged in"), "2024-01-15T10:00:00Z"));
    }
    for i in 0..2 {
        tracker.track(&record(i, &format!("b cache miss {i}"), "2024-01-15T10:00:00Z"));
        tracker.track(&record(i, &format!("a cache hit {i}"), "2024-01-15T10:00:00Z"));
    }
    let patterns = tracker.into_patterns(3);
    let templates: Vec<&str> = patterns.iter().map(|p| p.template.as_str()).collect();
    assert_eq!(templates, vec!["user NUMBER logged in", "a cache hit NUMBER", "b cache miss NUMBER"]);
    assert_eq!(patterns[0].examples, vec!["user 0 logged in", "user 1 logged in", "user 2 logged in"]);
    assert_eq!(patterns[1].examples.len(), 2);
}

#[test]
fn empty_messages_are_not_tracked() {
    let mut tracker = PatternTracker::default();
    let mut rec = record(1, "x", "2024-01-15T10:00:00Z");
    rec.message.clear();
    tracker.track(&rec);
    assert!(tracker.is_empty());
}

#[test]
fn missing_timestamp_uses_current_time() {
    let mut tracker = PatternTracker::default();
    let mut rec = record(1, "heartbeat", "2024-01-15T10:00:00Z");
    rec.timestamp = None;
    tracker.track(&rec);
    let p = tracker.get("heartbeat").unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&p.first_seen).is_ok());
    assert!(p.first_seen.as_str() > "2024-01-15");
}

#[test]
fn classifier_prefers_error_keywords() {
    assert_eq!(classify_template("Database connection failed"), Level::Error);
    assert_eq!(classify_template("Upstream TIMEOUT after NUMBER ms"), Level::Error);
    assert_eq!(classify_template("retry failed for job NUMBER"), Level::Error);
    assert_eq!(classify_template("Slow query took NUMBER ms"), Level::Warning);
    assert_eq!(classify_template("API is deprecated"), Level::Warning);
    assert_eq!(classify_template("User logged in"), Level::Info);
}
