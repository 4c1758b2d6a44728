//! Plain-text rendering of story and comment bodies.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Item;

static PARAGRAPH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<p(\s[^>]*)?>").expect("paragraph pattern is valid"));
static BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("break pattern is valid"));
static LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s+[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#).expect("link pattern is valid")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static BLANK_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"));

/// Turn comment HTML into readable text: paragraphs become blank lines,
/// `<br>` a newline, links `text [href]`, and other tags are dropped.
pub fn clean_html(html: &str) -> String {
    let s = PARAGRAPH.replace_all(html, "\n\n");
    let s = BREAK.replace_all(&s, "\n");
    let s = LINK.replace_all(&s, |caps: &regex::Captures| {
        let href = &caps[1];
        let text = TAG.replace_all(&caps[2], "");
        if text.trim().is_empty() || text.trim() == href {
            href.to_string()
        } else {
            format!("{} [{}]", text.trim(), href)
        }
    });
    let s = TAG.replace_all(&s, "");
    let s = html_escape::decode_html_entities(&s);
    BLANK_RUN.replace_all(s.trim(), "\n\n").into_owned()
}

/// Greedy word wrap. Existing newlines are kept and a word longer than
/// `width` gets a line of its own.
pub fn wrap_text(s: &str, width: usize) -> Vec<String> {
    let width = if width == 0 { 80 } else { width };
    let mut lines = Vec::new();

    for paragraph in s.split('\n') {
        let mut words = paragraph.split_whitespace();
        let Some(first) = words.next() else {
            lines.push(String::new());
            continue;
        };

        let mut current = first.to_string();
        let mut current_width = first.chars().count();
        for word in words {
            let word_width = word.chars().count();
            if current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                current_width += 1 + word_width;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
                current_width = word_width;
            }
        }
        lines.push(current);
    }

    lines
}

/// `42 points by alice 3 hours ago | 12 comments`
pub fn story_meta(item: &Item) -> String {
    let mut meta = format!("{} points", item.score);
    if !item.by.is_empty() {
        meta.push_str(&format!(" by {}", item.by));
    }
    meta.push_str(&format!(" {} | {} comments", item.time_ago(), item.descendants));
    meta
}

/// Shorten to `max` characters, ending in `...` when cut.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", s.chars().take(keep).collect::<String>())
}
