use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Provider-native numeric id, or a session-local pseudo-id.
pub type ItemId = u64;

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// A normalized story, post, article or comment body.
///
/// The field names follow the Hacker News item schema so that API responses
/// deserialize directly. Every other adapter fills the same fields by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub id: ItemId,
    /// Free-form routing data. Adapters stash a permalink, short id, topic
    /// path or GUID here so comments and canonical URLs can be derived later.
    #[serde(rename = "type")]
    pub kind: String,
    pub by: String,
    pub time: i64,
    pub text: String,
    pub url: String,
    pub title: String,
    pub score: i64,
    pub kids: Vec<ItemId>,
    pub descendants: u32,
    pub deleted: bool,
    pub dead: bool,
}

impl Item {
    /// Human relative age such as "3 hours ago".
    pub fn time_ago(&self) -> String {
        format_elapsed(Utc::now().timestamp() - self.time)
    }

    /// Bare host of `url` without scheme or a leading `www.`, keeping any port.
    pub fn domain(&self) -> String {
        extract_domain(&self.url)
    }

    /// Removed or flagged upstream; hidden during comment traversal.
    pub fn is_suppressed(&self) -> bool {
        self.deleted || self.dead
    }

    pub fn has_title(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Bucket an elapsed number of seconds into minute/hour/day/month/year wording.
pub fn format_elapsed(seconds: i64) -> String {
    let (count, unit) = if seconds >= YEAR {
        (seconds / YEAR, "year")
    } else if seconds >= MONTH {
        (seconds / MONTH, "month")
    } else if seconds >= DAY {
        (seconds / DAY, "day")
    } else if seconds >= HOUR {
        (seconds / HOUR, "hour")
    } else if seconds >= MINUTE {
        (seconds / MINUTE, "minute")
    } else {
        return "just now".to_string();
    };

    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

pub fn extract_domain(url: &str) -> String {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    match rest.find(|c| matches!(c, '/' | '?' | '#')) {
        Some(end) => rest[..end].to_string(),
        None => rest.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_aged(seconds: i64) -> Item {
        Item {
            time: Utc::now().timestamp() - seconds,
            ..Default::default()
        }
    }

    #[test]
    fn test_format_elapsed_buckets() {
        let cases = [
            (0, "just now"),
            (30, "just now"),
            (60, "1 minute ago"),
            (90, "1 minute ago"),
            (5 * MINUTE, "5 minutes ago"),
            (HOUR, "1 hour ago"),
            (3 * HOUR, "3 hours ago"),
            (25 * HOUR, "1 day ago"),
            (3 * DAY, "3 days ago"),
            (31 * DAY, "1 month ago"),
            (90 * DAY, "3 months ago"),
            (366 * DAY, "1 year ago"),
            (2 * YEAR, "2 years ago"),
        ];
        for (seconds, expected) in cases {
            assert_eq!(format_elapsed(seconds), expected, "{} seconds", seconds);
        }
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        assert_eq!(format_elapsed(-120), "just now");
    }

    #[test]
    fn test_time_ago_uses_item_time() {
        assert_eq!(item_aged(2 * HOUR + 5).time_ago(), "2 hours ago");
        assert_eq!(item_aged(25 * HOUR).time_ago(), "1 day ago");
    }

    #[test]
    fn test_domain_extraction() {
        let cases = [
            ("https://www.example.com/a/b", "example.com"),
            ("https://example.com:8080/x", "example.com:8080"),
            ("http://blog.rust-lang.org/2024/", "blog.rust-lang.org"),
            ("https://example.com", "example.com"),
            ("https://example.com?ref=hn", "example.com"),
            ("www.example.org/path", "example.org"),
            ("", ""),
        ];
        for (url, expected) in cases {
            let item = Item {
                url: url.to_string(),
                ..Default::default()
            };
            assert_eq!(item.domain(), expected, "{}", url);
        }
    }

    #[test]
    fn test_deserialize_hacker_news_item() {
        let json = r#"{
            "by": "dhouston",
            "descendants": 71,
            "id": 8863,
            "kids": [9224, 8917],
            "score": 104,
            "time": 1175714200,
            "title": "My YC app: Dropbox",
            "type": "story",
            "url": "http://www.getdropbox.com/u/2/screencast.html"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, 8863);
        assert_eq!(item.kind, "story");
        assert_eq!(item.kids, vec![9224, 8917]);
        assert_eq!(item.descendants, 71);
        assert_eq!(item.domain(), "getdropbox.com");
        assert!(item.text.is_empty());
        assert!(!item.is_suppressed());
    }

    #[test]
    fn test_suppression_flags() {
        let item: Item = serde_json::from_str(r#"{"id": 1, "deleted": true}"#).unwrap();
        assert!(item.is_suppressed());
        assert!(!item.has_title());
    }
}
