use logsieve::formats::{FormatCategory, FormatDescriptor, FormatRegistry, MatchRule};
use logsieve::level::Level;
use logsieve::parser::{parse_line, split_fields, LineParser, ParseError, ParsedRecord};

fn format(id: &str) -> &'static FormatDescriptor {
    FormatRegistry::builtin().get(id).expect("builtin format")
}

#[test]
fn apache_combined_line_promotes_http_fields() {
    let line = r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#;
    let rec = parse_line(line, format("apache_combined"), 3).unwrap();
    assert_eq!(rec.line_number, 3);
    assert_eq!(rec.raw_line, line);
    assert_eq!(rec.timestamp.as_deref(), Some("2000-10-10T20:55:36.000Z"));
    assert_eq!(rec.ip_address.as_deref(), Some("127.0.0.1"));
    assert_eq!(rec.status_code, Some(200));
    assert_eq!(rec.response_size, Some(2326));
    assert_eq!(rec.user_agent.as_deref(), Some("Mozilla/4.08 [en] (Win98; I ;Nav)"));
    assert_eq!(rec.message, "GET /apache_pb.gif HTTP/1.0");
    assert_eq!(rec.level, Level::Info);
    assert!(rec.source.is_none());
    assert!(rec.error.is_none());
    assert_eq!(rec.parsed_fields.get("user").and_then(|v| v.as_str()), Some("frank"));
    assert!(rec.processing_time >= 0.0);
}

#[test]
fn dash_size_is_treated_as_absent() {
    let line = r#"10.1.2.3 - - [15/Jan/2024:10:30:00 +0000] "GET / HTTP/1.1" 304 -"#;
    let rec = parse_line(line, format("apache_common"), 1).unwrap();
    assert_eq!(rec.status_code, Some(304));
    assert_eq!(rec.response_size, None);
}

#[test]
fn text_mismatch_is_a_recoverable_error() {
    let err = parse_line("definitely not an access log", format("apache_common"), 9).unwrap_err();
    assert_eq!(err, ParseError::PatternMismatch { format: "apache_common".to_string() });

    let rec = ParsedRecord::failed(9, "definitely not an access log", &err);
    assert!(rec.is_error());
    assert_eq!(rec.level, Level::Unknown);
    assert_eq!(rec.message, "definitely not an access log");
    assert!(!rec.error.unwrap().is_empty());
}

#[test]
fn json_aliases_fill_named_fields() {
    let line = r#"{"@timestamp":"2024-01-15T10:30:00Z","severity":"ERROR","msg":"Database connection failed","service":"api","client_ip":"10.0.0.7","status_code":503}"#;
    let rec = parse_line(line, format("json"), 1).unwrap();
    assert_eq!(rec.timestamp.as_deref(), Some("2024-01-15T10:30:00.000Z"));
    assert_eq!(rec.level, Level::Error);
    assert_eq!(rec.message, "Database connection failed");
    assert_eq!(rec.source.as_deref(), Some("api"));
    assert_eq!(rec.ip_address.as_deref(), Some("10.0.0.7"));
    assert_eq!(rec.status_code, Some(503));
    assert_eq!(rec.parsed_fields.len(), 6);
}

#[test]
fn json_numeric_level_uses_syslog_codes() {
    let rec = parse_line(r#"{"level":3,"message":"disk full"}"#, format("json"), 1).unwrap();
    assert_eq!(rec.level, Level::Error);
}

#[test]
fn json_without_message_falls_back_to_raw_line() {
    let line = r#"  {"level":"warn","op":"sync"}  "#;
    let rec = parse_line(line, format("json"), 1).unwrap();
    assert_eq!(rec.level, Level::Warning);
    assert_eq!(rec.message, r#"{"level":"warn","op":"sync"}"#);
}

#[test]
fn json_errors_are_reported_per_line() {
    let json = format("json");
    assert!(matches!(parse_line("{not json", json, 1), Err(ParseError::InvalidJson(_))));
    assert_eq!(parse_line("[1,2,3]", json, 1).unwrap_err(), ParseError::NotAnObject);
}

#[test]
fn delimited_values_get_positional_names() {
    let rec = parse_line("2024-01-15T10:30:00Z, error ,\"api gateway\",boom", format("csv"), 4).unwrap();
    let get = |k: &str| rec.parsed_fields.get(k).and_then(|v| v.as_str()).map(str::to_string);
    assert_eq!(get("field_1").as_deref(), Some("2024-01-15T10:30:00Z"));
    assert_eq!(get("field_2").as_deref(), Some("error"));
    assert_eq!(get("field_3").as_deref(), Some("api gateway"));
    assert_eq!(get("field_4").as_deref(), Some("boom"));
    // no named columns, so the whole line is the message
    assert_eq!(rec.message, "2024-01-15T10:30:00Z, error ,\"api gateway\",boom");
    assert_eq!(rec.level, Level::Info);
}

#[test]
fn named_delimited_columns_are_promoted() {
    let d = FormatDescriptor {
        id: "app_csv".to_string(),
        name: "App CSV export".to_string(),
        category: FormatCategory::Delimited,
        rule: MatchRule::Delimited { delimiter: Some(',') },
        fields: ["timestamp", "level", "source", "message"].iter().map(|f| f.to_string()).collect(),
        sample: String::new(),
    };
    let rec = parse_line("2024-01-15 10:30:00,ERROR,api,Database connection failed,extra", &d, 1).unwrap();
    assert_eq!(rec.timestamp.as_deref(), Some("2024-01-15T10:30:00.000Z"));
    assert_eq!(rec.level, Level::Error);
    assert_eq!(rec.source.as_deref(), Some("api"));
    assert_eq!(rec.message, "Database connection failed");
    assert_eq!(rec.parsed_fields.get("field_5").and_then(|v| v.as_str()), Some("extra"));
}

#[test]
fn delimited_aliases_cover_time_severity_and_msg() {
    let d = FormatDescriptor {
        fields: ["time", "severity", "hostname", "msg"].iter().map(|f| f.to_string()).collect(),
        ..FormatDescriptor::detected_delimited('|')
    };
    let rec = parse_line("2024-01-15T10:30:00Z|warn|web01|disk almost full", &d, 1).unwrap();
    assert_eq!(rec.timestamp.as_deref(), Some("2024-01-15T10:30:00.000Z"));
    assert_eq!(rec.level, Level::Warning);
    assert_eq!(rec.source.as_deref(), Some("web01"));
    assert_eq!(rec.message, "disk almost full");
}

#[test]
fn delimited_line_without_separator_fails() {
    let err = parse_line("no separators here", format("tsv"), 1).unwrap_err();
    assert_eq!(err, ParseError::MissingDelimiter { delimiter: "tab".to_string() });
}

#[test]
fn detected_delimiter_descriptor_parses_pipes() {
    let d = FormatDescriptor::detected_delimited('|');
    let rec = parse_line("a|b|c", &d, 1).unwrap();
    assert_eq!(rec.parsed_fields.len(), 3);
    assert_eq!(rec.parsed_fields.get("field_3").and_then(|v| v.as_str()), Some("c"));
}

#[test]
fn rfc5424_priority_decodes_level_and_facility() {
    let line = r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3"] An application event log entry"#;
    let rec = parse_line(line, format("syslog_rfc5424"), 1).unwrap();
    assert_eq!(rec.level, Level::Notice);
    assert_eq!(rec.parsed_fields.get("facility").and_then(|v| v.as_u64()), Some(20));
    assert_eq!(rec.timestamp.as_deref(), Some("2003-10-11T22:14:15.003Z"));
    assert_eq!(rec.source.as_deref(), Some("mymachine.example.com"));
    assert_eq!(rec.message, "An application event log entry");
}

#[test]
fn bsd_syslog_uses_reference_year() {
    let d = format("syslog_rfc3164");
    let rec = LineParser::new(d)
        .with_year(2023)
        .parse_line("Oct 11 22:14:15 mymachine CRON[2301]: (root) CMD (run-parts /etc/cron.hourly)", 1)
        .unwrap();
    assert_eq!(rec.timestamp.as_deref(), Some("2023-10-11T22:14:15.000Z"));
    assert_eq!(rec.source.as_deref(), Some("mymachine"));
    assert_eq!(rec.message, "(root) CMD (run-parts /etc/cron.hourly)");
    assert_eq!(rec.level, Level::Info);
    assert!(rec.parsed_fields.get("facility").is_none());
}

#[test]
fn auth_log_extracts_remote_ip_from_message() {
    let line = "Feb 14 06:25:12 server1 sshd[4122]: Failed password for invalid user admin from 203.0.113.45 port 52144 ssh2";
    let rec = parse_line(line, format("auth_log"), 1).unwrap();
    assert_eq!(rec.ip_address.as_deref(), Some("203.0.113.45"));
    assert_eq!(rec.message, "Failed password for invalid user admin from 203.0.113.45 port 52144 ssh2");
    assert_eq!(rec.source.as_deref(), Some("server1"));
}

#[test]
fn unparseable_timestamp_is_left_empty() {
    let rec = parse_line(r#"{"time":"yesterday","message":"x"}"#, format("json"), 1).unwrap();
    assert!(rec.timestamp.is_none());
    assert!(rec.error.is_none());
}

#[test]
fn split_fields_handles_spaces_and_quotes() {
    assert_eq!(split_fields("a  b   c", ' '), vec!["a", "b", "c"]);
    assert_eq!(split_fields(r#""x", y ,"z""#, ','), vec!["x", "y", "z"]);
    assert_eq!(split_fields("a,,b", ','), vec!["a", "", "b"]);
}

#[test]
fn record_serializes_with_storage_field_names() {
    let rec = parse_line(r#"{"message":"hi"}"#, format("json"), 2).unwrap();
    let v = serde_json::to_value(&rec).unwrap();
    assert_eq!(v["lineNumber"], 2);
    assert_eq!(v["rawLine"], r#"{"message":"hi"}"#);
    assert_eq!(v["level"], "info");
    assert!(v.get("parsedFields").is_some());
    assert!(v.get("processingTime").is_some());
    let back: ParsedRecord = serde_json::from_value(v).unwrap();
    assert_eq!(back.line_number, rec.line_number);
    assert_eq!(back.message, rec.message);
}
