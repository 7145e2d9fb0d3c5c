//! Built-in catalog of log dialects.
//!
//! The registry is an ordered list: when two descriptors score the same during
//! detection, the one registered first wins, so more specific dialects are
//! listed ahead of the generic ones they overlap with.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatCategory {
    WebServer,
    Syslog,
    Container,
    Database,
    Security,
    Application,
    Structured,
    Delimited,
}

/// How a descriptor recognizes and splits a line.
#[derive(Debug, Clone)]
pub enum MatchRule {
    /// Anchored regex; capture groups map positionally onto `fields`.
    StructuredText { pattern: Regex },
    /// One JSON object per line.
    SemiStructured,
    /// Separator-split values; `None` means the delimiter is supplied by detection.
    Delimited { delimiter: Option<char> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    StructuredText,
    SemiStructured,
    Delimited,
}

#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    pub id: String,
    pub name: String,
    pub category: FormatCategory,
    pub rule: MatchRule,
    pub fields: Vec<String>,
    /// Representative line, for listings only.
    pub sample: String,
}

/// Listing metadata for a descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatInfo {
    pub id: String,
    pub name: String,
    pub category: FormatCategory,
    pub kind: FormatKind,
    pub fields: Vec<String>,
    pub sample: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl FormatDescriptor {
    pub fn kind(&self) -> FormatKind {
        match self.rule {
            MatchRule::StructuredText { .. } => FormatKind::StructuredText,
            MatchRule::SemiStructured => FormatKind::SemiStructured,
            MatchRule::Delimited { .. } => FormatKind::Delimited,
        }
    }

    pub fn delimiter(&self) -> Option<char> {
        match self.rule {
            MatchRule::Delimited { delimiter } => delimiter,
            _ => None,
        }
    }

    /// Ad-hoc descriptor for a delimiter discovered by the detector.
    pub fn detected_delimited(delimiter: char) -> Self {
        FormatDescriptor {
            id: DELIMITED_ID.to_string(),
            name: format!("Delimited ({})", delimiter_label(delimiter)),
            category: FormatCategory::Delimited,
            rule: MatchRule::Delimited { delimiter: Some(delimiter) },
            fields: Vec::new(),
            sample: String::new(),
        }
    }

    pub fn info(&self) -> FormatInfo {
        FormatInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category,
            kind: self.kind(),
            fields: self.fields.clone(),
            sample: self.sample.clone(),
            delimiter: self.delimiter().map(delimiter_label),
        }
    }
}

/// Id reported for the auto-detected delimited hypothesis.
pub const DELIMITED_ID: &str = "delimited";

pub fn delimiter_label(d: char) -> String {
    match d {
        '\t' => "tab".to_string(),
        ' ' => "space".to_string(),
        other => other.to_string(),
    }
}

enum Rule {
    Regex(&'static str),
    Json,
    Delimited(char),
}

struct Entry {
    id: &'static str,
    name: &'static str,
    category: FormatCategory,
    rule: Rule,
    fields: &'static [&'static str],
    sample: &'static str,
}

use FormatCategory::*;

const CATALOG: &[Entry] = &[
    Entry {
        id: "apache_combined",
        name: "Apache/Nginx Combined Log Format",
        category: WebServer,
        rule: Rule::Regex(r#"^(\S+) (\S+) (\S+) \[([^\]]+)\] "([^"]*)" (\d{3}) (\d+|-) "([^"]*)" "([^"]*)"$"#),
        fields: &["ip", "ident", "user", "timestamp", "request", "status", "size", "referer", "user_agent"],
        sample: r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326 "http://www.example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#,
    },
    Entry {
        id: "nginx_access",
        name: "Nginx Access Log (with X-Forwarded-For)",
        category: WebServer,
        rule: Rule::Regex(r#"^(\S+) - (\S+) \[([^\]]+)\] "([^"]*)" (\d{3}) (\d+|-) "([^"]*)" "([^"]*)" "([^"]*)"$"#),
        fields: &["ip", "user", "timestamp", "request", "status", "size", "referer", "user_agent", "forwarded_for"],
        sample: r#"192.168.1.20 - - [15/Jan/2024:10:30:00 +0000] "POST /api/login HTTP/1.1" 401 182 "-" "curl/8.4.0" "203.0.113.7""#,
    },
    Entry {
        id: "apache_common",
        name: "Apache Common Log Format",
        category: WebServer,
        rule: Rule::Regex(r#"^(\S+) (\S+) (\S+) \[([^\]]+)\] "([^"]*)" (\d{3}) (\d+|-)$"#),
        fields: &["ip", "ident", "user", "timestamp", "request", "status", "size"],
        sample: r#"127.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /apache_pb.gif HTTP/1.0" 200 2326"#,
    },
    Entry {
        id: "nginx_error",
        name: "Nginx Error Log",
        category: WebServer,
        rule: Rule::Regex(r"^(\d{4}/\d{2}/\d{2} \d{2}:\d{2}:\d{2}) \[(\w+)\] (\d+)#(\d+): (?:\*(\d+) )?(.*)$"),
        fields: &["timestamp", "level", "pid", "tid", "connection", "message"],
        sample: r#"2024/01/15 10:30:00 [error] 1234#5678: *9 open() "/var/www/favicon.ico" failed (2: No such file or directory), client: 192.168.1.10, server: example.com"#,
    },
    Entry {
        id: "apache_error",
        name: "Apache Error Log",
        category: WebServer,
        rule: Rule::Regex(r"^\[([^\]]+)\] \[(?:[\w-]+:)?(\w+)\](?: \[pid (\d+)(?::tid \d+)?\])?(?: \[client ([\d.]+)(?::\d+)?\])? (.*)$"),
        fields: &["timestamp", "level", "pid", "client_ip", "message"],
        sample: "[Wed Oct 11 14:32:52.123456 2000] [core:error] [pid 35708:tid 4328636416] [client 72.15.99.187:54321] File does not exist: /usr/local/apache2/htdocs/favicon.ico",
    },
    Entry {
        id: "syslog_rfc5424",
        name: "Syslog (RFC 5424)",
        category: Syslog,
        rule: Rule::Regex(r"^<(\d{1,3})>1 (\S+) (\S+) (\S+) (\S+) (\S+) (-|\[.*?\])(?: (.*))?$"),
        fields: &["pri", "timestamp", "hostname", "app_name", "procid", "msgid", "structured_data", "message"],
        sample: r#"<165>1 2003-10-11T22:14:15.003Z mymachine.example.com evntslog - ID47 [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"] An application event log entry"#,
    },
    Entry {
        id: "auth_log",
        name: "Linux Auth Log (sshd/sudo)",
        category: Security,
        rule: Rule::Regex(r"^([A-Z][a-z]{2}\s+\d{1,2} \d{2}:\d{2}:\d{2}) (\S+) (sshd|sudo|su|login|passwd|systemd-logind)(?:\[(\d+)\])?: ((?:.*?from (\d{1,3}(?:\.\d{1,3}){3}))?.*)$"),
        fields: &["timestamp", "hostname", "process", "pid", "message", "ip"],
        sample: "Feb 14 06:25:12 server1 sshd[4122]: Failed password for invalid user admin from 203.0.113.45 port 52144 ssh2",
    },
    Entry {
        id: "syslog_rfc3164",
        name: "Syslog (BSD / RFC 3164)",
        category: Syslog,
        rule: Rule::Regex(r"^(?:<(\d{1,3})>)?([A-Z][a-z]{2}\s+\d{1,2} \d{2}:\d{2}:\d{2}) (\S+) ([^\s:\[]+)(?:\[(\d+)\])?: (.*)$"),
        fields: &["pri", "timestamp", "hostname", "process", "pid", "message"],
        sample: "Oct 11 22:14:15 mymachine CRON[2301]: (root) CMD (run-parts /etc/cron.hourly)",
    },
    Entry {
        id: "systemd_journal",
        name: "systemd Journal (short-iso)",
        category: Syslog,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:?\d{2})) (\S+) ([^\s:\[]+)(?:\[(\d+)\])?: (.*)$"),
        fields: &["timestamp", "hostname", "process", "pid", "message"],
        sample: "2024-01-15T10:30:00+0000 web01 systemd[1]: Started Session 42 of user alice.",
    },
    Entry {
        id: "kubernetes_klog",
        name: "Kubernetes Component Log (klog)",
        category: Container,
        rule: Rule::Regex(r"^([IWEF])(\d{4} \d{2}:\d{2}:\d{2}\.\d+)\s+(\d+) ([^:\]\s]+:\d+)\] (.*)$"),
        fields: &["level", "timestamp", "thread", "caller", "message"],
        sample: "I0115 10:30:00.123456    1234 controller.go:123] Successfully synced pod default/nginx-7c5ddbdf54-x8f9q",
    },
    Entry {
        id: "docker_daemon",
        name: "Docker Daemon (logrus text)",
        category: Container,
        rule: Rule::Regex(r#"^time="([^"]+)" level=(\w+) msg="((?:[^"\\]|\\.)*)"(.*)$"#),
        fields: &["timestamp", "level", "message", "extra"],
        sample: r#"time="2024-01-15T10:30:00.123456789Z" level=info msg="Container 3f2a started" container=3f2a module=libcontainerd"#,
    },
    Entry {
        id: "kubernetes_cri",
        name: "Kubernetes Container Log (CRI)",
        category: Container,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+(?:Z|[+-]\d{2}:\d{2})) (stdout|stderr) ([FP]) (.*)$"),
        fields: &["timestamp", "stream", "tag", "message"],
        sample: "2024-01-15T10:30:00.123456789Z stdout F GET /healthz 200",
    },
    Entry {
        id: "postgresql",
        name: "PostgreSQL Server Log",
        category: Database,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}(?:\.\d+)?(?: [A-Z]{2,5})?) \[(\d+)\](?:-\d+)?:? (?:(\S+@\S+) )?(LOG|ERROR|WARNING|FATAL|PANIC|NOTICE|INFO|DEBUG\d?|STATEMENT|DETAIL|HINT|CONTEXT):\s+(.*)$"),
        fields: &["timestamp", "pid", "user_db", "level", "message"],
        sample: r#"2024-01-15 10:30:00.123 UTC [12345] postgres@app ERROR:  relation "users" does not exist at character 15"#,
    },
    Entry {
        id: "mysql_error",
        name: "MySQL Error Log",
        category: Database,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d+(?:Z|[+-]\d{2}:\d{2})) (\d+) \[(\w+)\](?: \[([^\]]+)\] \[([^\]]+)\])? (.*)$"),
        fields: &["timestamp", "thread", "level", "error_code", "subsystem", "message"],
        sample: "2024-01-15T10:30:00.123456Z 0 [Warning] [MY-010068] [Server] CA certificate ca.pem is self signed.",
    },
    Entry {
        id: "mongodb",
        name: "MongoDB Log (legacy text)",
        category: Database,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}(?:Z|[+-]\d{4}|[+-]\d{2}:\d{2})) ([FEWID]\d?) (\w+|-)\s+\[([^\]]+)\] (.*)$"),
        fields: &["timestamp", "level", "component", "context", "message"],
        sample: "2024-01-15T10:30:00.123+0000 I NETWORK  [conn42] end connection 10.0.0.5:51234 (3 connections now open)",
    },
    Entry {
        id: "redis",
        name: "Redis Server Log",
        category: Database,
        rule: Rule::Regex(r"^(\d+):([XCSM]) (\d{2} [A-Z][a-z]{2} \d{4} \d{2}:\d{2}:\d{2}\.\d{3}) ([.\-*#]) (.*)$"),
        fields: &["pid", "role", "timestamp", "marker", "message"],
        sample: "1234:M 15 Jan 2024 10:30:00.123 * Ready to accept connections tcp",
    },
    Entry {
        id: "snort_fast",
        name: "Snort/Suricata fast.log Alert",
        category: Security,
        rule: Rule::Regex(r"^(\d{2}/\d{2}(?:/\d{2,4})?-\d{2}:\d{2}:\d{2}\.\d+)\s+\[\*\*\] \[(\d+:\d+:\d+)\] (.*?) \[\*\*\](?: \[Classification: ([^\]]*)\])? \[Priority: (\d+)\] \{(\w+)\} ([\d.]+)(?::(\d+))? -> ([\d.]+)(?::(\d+))?$"),
        fields: &["timestamp", "signature", "message", "classification", "priority", "protocol", "ip", "src_port", "dst_ip", "dst_port"],
        sample: "01/15-10:30:00.123456  [**] [1:2001219:20] ET SCAN Potential SSH Scan [**] [Classification: Attempted Information Leak] [Priority: 2] {TCP} 203.0.113.45:52144 -> 10.0.0.5:22",
    },
    Entry {
        id: "fail2ban",
        name: "Fail2ban Log",
        category: Security,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}) (fail2ban\.\S+)\s+\[(\d+)\]: (\w+)\s+(?:\[([^\]]+)\] )?((?:.*?(?:Ban|Unban|Found) (\d{1,3}(?:\.\d{1,3}){3}))?.*)$"),
        fields: &["timestamp", "logger", "pid", "level", "jail", "message", "ip"],
        sample: "2024-01-15 10:30:00,123 fail2ban.actions        [1234]: NOTICE  [sshd] Ban 203.0.113.45",
    },
    Entry {
        id: "spring_boot",
        name: "Spring Boot Application Log",
        category: Application,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}\.\d{3}(?:Z|[+-]\d{2}:\d{2})?)\s+(TRACE|DEBUG|INFO|WARN|ERROR|FATAL)\s+(\d+) --- \[\s*([^\]]+)\] (\S+)\s*: (.*)$"),
        fields: &["timestamp", "level", "pid", "thread", "logger", "message"],
        sample: "2024-01-15 10:30:00.123  INFO 12345 --- [           main] o.s.b.w.embedded.tomcat.TomcatWebServer  : Tomcat started on port(s): 8080 (http)",
    },
    Entry {
        id: "log4j",
        name: "Java Log4j / Logback",
        category: Application,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}[,.]\d{3}) \[([^\]]+)\] (TRACE|DEBUG|INFO|WARN|ERROR|FATAL)\s+(\S+)\s+-\s+(.*)$"),
        fields: &["timestamp", "thread", "level", "logger", "message"],
        sample: "2024-01-15 10:30:00,123 [http-nio-8080-exec-1] ERROR com.example.OrderService - Failed to process order 42",
    },
    Entry {
        id: "python_logging",
        name: "Python logging (default formatter)",
        category: Application,
        rule: Rule::Regex(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}) - (\S+) - (DEBUG|INFO|WARNING|ERROR|CRITICAL) - (.*)$"),
        fields: &["timestamp", "logger", "level", "message"],
        sample: "2024-01-15 10:30:00,123 - myapp.db - WARNING - Slow query took 1532 ms",
    },
    Entry {
        id: "generic_timestamped",
        name: "Generic Timestamp + Level",
        category: Application,
        rule: Rule::Regex(r"^\[?(\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d+)?(?:Z|[+-]\d{2}:?\d{2})?)\]?\s+\[?((?i:trace|debug|info|notice|warn|warning|error|err|critical|crit|fatal|alert|emerg))\]?:?\s+(.*)$"),
        fields: &["timestamp", "level", "message"],
        sample: "2024-01-15T10:30:00.123Z [ERROR] Payment gateway timeout after 30000ms",
    },
    Entry {
        id: "json",
        name: "JSON Lines",
        category: Structured,
        rule: Rule::Json,
        fields: &[],
        sample: r#"{"timestamp":"2024-01-15T10:30:00Z","level":"error","message":"Database connection failed","service":"api"}"#,
    },
    Entry {
        id: "csv",
        name: "Comma-Separated Values",
        category: Delimited,
        rule: Rule::Delimited(','),
        fields: &[],
        sample: "2024-01-15T10:30:00Z,error,api,Database connection failed",
    },
    Entry {
        id: "tsv",
        name: "Tab-Separated Values",
        category: Delimited,
        rule: Rule::Delimited('\t'),
        fields: &[],
        sample: "2024-01-15T10:30:00Z\terror\tapi\tDatabase connection failed",
    },
];

/// Read-only, ordered lookup of format descriptors.
#[derive(Debug)]
pub struct FormatRegistry {
    descriptors: Vec<FormatDescriptor>,
}

static BUILTIN: Lazy<FormatRegistry> = Lazy::new(|| FormatRegistry {
    descriptors: CATALOG.iter().map(build).collect(),
});

fn build(e: &Entry) -> FormatDescriptor {
    let rule = match e.rule {
        Rule::Regex(p) => MatchRule::StructuredText { pattern: Regex::new(p).unwrap() },
        Rule::Json => MatchRule::SemiStructured,
        Rule::Delimited(d) => MatchRule::Delimited { delimiter: Some(d) },
    };
    FormatDescriptor {
        id: e.id.to_string(),
        name: e.name.to_string(),
        category: e.category,
        rule,
        fields: e.fields.iter().map(|f| f.to_string()).collect(),
        sample: e.sample.to_string(),
    }
}

impl FormatRegistry {
    pub fn builtin() -> &'static FormatRegistry {
        &BUILTIN
    }

    pub fn get(&self, id: &str) -> Option<&FormatDescriptor> {
        self.descriptors.iter().find(|d| d.id == id)
    }

    /// Descriptors in catalog (priority) order.
    pub fn iter(&self) -> impl Iterator<Item = &FormatDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Metadata for every built-in format, in catalog order.
pub fn list_formats() -> Vec<FormatInfo> {
    FormatRegistry::builtin().iter().map(FormatDescriptor::info).collect()
}
