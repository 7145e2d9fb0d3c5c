use once_cell::sync::Lazy;
use regex::Regex;

static RE_IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b").unwrap()
});

// ISO-like date-time: date, `T` or space, time, optional fraction and offset.
static RE_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(?:[.,]\d{1,9})?(?:Z|[+-]\d{2}(?::?\d{2})?)?").unwrap()
});

static RE_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b").unwrap()
});

static RE_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

pub const IP_PLACEHOLDER: &str = "IP_ADDRESS";
pub const TIMESTAMP_PLACEHOLDER: &str = "TIMESTAMP";
pub const UUID_PLACEHOLDER: &str = "UUID";
pub const NUMBER_PLACEHOLDER: &str = "NUMBER";

/// Replace dynamic substrings with placeholders. Order matters: IPs and
/// timestamps must go before the digit pass would shred them. Placeholders
/// contain no digits, so generalizing a template is a no-op.
pub fn generalize(message: &str) -> String {
    let s = RE_IPV4.replace_all(message, IP_PLACEHOLDER);
    let s = RE_TIMESTAMP.replace_all(&s, TIMESTAMP_PLACEHOLDER);
    let s = RE_UUID.replace_all(&s, UUID_PLACEHOLDER);
    let s = RE_DIGITS.replace_all(&s, NUMBER_PLACEHOLDER);
    s.into_owned()
}
