use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_SYSLOG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2})\s+(\d{2}:\d{2}:\d{2})\b").unwrap()
});

// Date, time, optional fraction (dot or comma), optional offset; trailing text such as a zone name is ignored.
static RE_ISO_LIKE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2}:\d{2})(?:[.,](\d{1,9}))?(?:\s?(Z|[+-]\d{2}(?::?\d{2})?))?").unwrap()
});

// klog `MMDD hh:mm:ss.ffffff`
static RE_KLOG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})(\d{2}) (\d{2}:\d{2}:\d{2})(?:\.(\d{1,9}))?$").unwrap());

// snort fast.log `MM/DD[/YY]-hh:mm:ss.ffffff`
static RE_SNORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})(?:/(\d{4}|\d{2}))?-(\d{2}:\d{2}:\d{2})(?:\.(\d{1,9}))?$").unwrap()
});

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

/// Normalize a timestamp-like string to ISO-8601 (UTC, millisecond precision).
/// Syslog timestamps without a year use the current UTC year.
pub fn normalize_timestamp(raw: &str) -> Option<String> {
    normalize_timestamp_with_year(raw, Utc::now().year())
}

pub fn normalize_timestamp_with_year(raw: &str, year: i32) -> Option<String> {
    parse_timestamp(raw, year).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Try general-purpose parsing first, then the web-server, syslog, yearless
/// numeric and ISO-like conventions in that order. `None` is a normal outcome, not an error.
pub fn parse_timestamp(raw: &str, year: i32) -> Option<DateTime<Utc>> {
    let s = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    if s.is_empty() {
        return None;
    }
    parse_general(s)
        .or_else(|| parse_web_server(s))
        .or_else(|| parse_syslog(s, year))
        .or_else(|| parse_numeric_yearless(s, year))
        .or_else(|| parse_iso_like(s))
}

fn parse_general(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let zoned = [
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y/%m/%d %H:%M:%S%.f %z",
    ];
    for f in zoned.iter() {
        if let Ok(dt) = DateTime::parse_from_str(s, f) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    let naive = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%a %b %d %H:%M:%S%.f %Y",
        "%d %b %Y %H:%M:%S%.f",
        "%d-%b-%Y %H:%M:%S%.f",
    ];
    for f in naive.iter() {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, f) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    parse_epoch(s)
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let n: i64 = s.parse().ok()?;
    match s.len() {
        10 => DateTime::<Utc>::from_timestamp(n, 0),
        13 => DateTime::<Utc>::from_timestamp(n / 1000, ((n % 1000) * 1_000_000) as u32),
        16 => DateTime::<Utc>::from_timestamp(n / 1_000_000, ((n % 1_000_000) * 1_000) as u32),
        _ => None,
    }
}

/// `10/Oct/2000:13:55:36 -0700`
fn parse_web_server(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%d/%b/%Y:%H:%M:%S %z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `Oct 10 13:55:36`, with the year supplied by the caller.
fn parse_syslog(s: &str, year: i32) -> Option<DateTime<Utc>> {
    let caps = RE_SYSLOG.captures(s)?;
    let month = MONTHS.iter().position(|m| *m == &caps[1])? as u32 + 1;
    let day: u32 = caps[2].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::parse_from_str(&caps[3], "%H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn parse_numeric_yearless(s: &str, year: i32) -> Option<DateTime<Utc>> {
    if let Some(caps) = RE_KLOG.captures(s) {
        return month_day_time(year, &caps[1], &caps[2], &caps[3], caps.get(4).map(|m| m.as_str()));
    }
    let caps = RE_SNORT.captures(s)?;
    let year = match caps.get(3).map(|m| m.as_str()) {
        Some(y) if y.len() == 2 => 2000 + y.parse::<i32>().ok()?,
        Some(y) => y.parse().ok()?,
        None => year,
    };
    month_day_time(year, &caps[1], &caps[2], &caps[4], caps.get(5).map(|m| m.as_str()))
}

fn month_day_time(year: i32, month: &str, day: &str, time: &str, frac: Option<&str>) -> Option<DateTime<Utc>> {
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    let mut ndt = date.and_time(time);
    if let Some(digits) = frac {
        ndt += fraction(digits)?;
    }
    Some(Utc.from_utc_datetime(&ndt))
}

/// Fractional-second digits (1..=9 of them) as a duration.
fn fraction(digits: &str) -> Option<chrono::Duration> {
    let nanos: i64 = format!("{digits:0<9}").parse().ok()?;
    Some(chrono::Duration::nanoseconds(nanos))
}

fn parse_iso_like(s: &str) -> Option<DateTime<Utc>> {
    let caps = RE_ISO_LIKE.captures(s)?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(&caps[2], "%H:%M:%S").ok()?;
    let mut ndt = date.and_time(time);
    if let Some(frac) = caps.get(3) {
        ndt += fraction(frac.as_str())?;
    }
    match caps.get(4).map(|m| m.as_str()) {
        None | Some("Z") => Some(Utc.from_utc_datetime(&ndt)),
        Some(tz) => {
            let offset = parse_offset(tz)?;
            offset.from_local_datetime(&ndt).single().map(|dt| dt.with_timezone(&Utc))
        }
    }
}

fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let sign = if tz.starts_with('-') { -1 } else { 1 };
    let digits: String = tz[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let (hh, mm) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hh * 3600 + mm * 60))
}
