//! Timestamp parsing shared by the scraped and feed-based sources.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+)\s*(second|minute|hour|day|week|month|year)s?\s*ago")
        .expect("relative time pattern is valid")
});

const ZONED_FORMATS: &[&str] = &["%a, %d %b %Y %H:%M:%S %z", "%Y-%m-%d %H:%M:%S %z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Try the known absolute layouts in order: RFC 2822/1123, RFC 3339, then a
/// few site-specific ones. Zone-less values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp());
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.timestamp());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}

/// Parse an absolute timestamp, falling back to the current time.
pub fn parse_or_now(s: &str) -> i64 {
    parse_timestamp(s).unwrap_or_else(now)
}

/// Resolve strings like "3 hours ago" against `now`.
pub fn parse_relative(s: &str, now: i64) -> Option<i64> {
    let lowered = s.trim().to_lowercase();
    let caps = RELATIVE.captures(&lowered)?;
    let count: i64 = caps[1].parse().ok()?;
    let unit = match &caps[2] {
        "second" => 1,
        "minute" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 7 * 86_400,
        "month" => 30 * 86_400,
        "year" => 365 * 86_400,
        _ => return None,
    };
    Some(now - count.saturating_mul(unit))
}

/// Pick the first usable value from a `<time>` element: its machine
/// `datetime`, its `title`, then its relative text. Falls back to now.
pub fn resolve(datetime: Option<&str>, title: Option<&str>, text: &str) -> i64 {
    let current = now();
    datetime
        .and_then(parse_timestamp)
        .or_else(|| title.and_then(parse_timestamp))
        .or_else(|| parse_relative(text, current))
        .unwrap_or(current)
}
