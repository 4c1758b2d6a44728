//! Helpers for pulling fields out of scraped HTML.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::source::timefmt;

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("digit pattern is valid"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space pattern is valid"));

/// Compile a selector known at build time.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Collapsed, trimmed text content of an element.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn first<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    el.select(sel).next()
}

/// First match that belongs to `el` itself rather than to a nested block
/// also matching `owner`, such as a reply inside a comment.
pub fn first_own<'a>(
    el: ElementRef<'a>,
    sel: &Selector,
    owner: &Selector,
) -> Option<ElementRef<'a>> {
    el.select(sel).find(|found| {
        found
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|ancestor| owner.matches(ancestor))
            .is_some_and(|nearest| nearest.id() == el.id())
    })
}

/// Text of the first match, if it is non-empty.
pub fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    first(el, sel).map(text_of).filter(|t| !t.is_empty())
}

/// First run of digits in free text, e.g. "12 comments" -> 12.
pub fn first_number(text: &str) -> Option<i64> {
    DIGITS
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Text that is nothing but a (possibly signed) integer.
pub fn exact_number(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

/// Rewrite a site-relative href against `base`. Absolute URLs pass through.
pub fn absolutize(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), href)
    }
}

/// Timestamp of the first `<time>`-like element matched by `sel`.
pub fn time_of(el: ElementRef<'_>, sel: &Selector) -> i64 {
    time_at(first(el, sel))
}

/// Timestamp carried by a `<time>`-like element, or now when there is none.
pub fn time_at(time: Option<ElementRef<'_>>) -> i64 {
    match time {
        Some(time) => timefmt::resolve(
            time.value().attr("datetime"),
            time.value().attr("title"),
            &text_of(time),
        ),
        None => timefmt::now(),
    }
}

/// Nesting depth of a comment block.
///
/// An explicit numeric `depth_attr` on the element wins. Otherwise the
/// depth is the number of ancestors matching `container`, minus one for the
/// top-level list that holds root comments.
pub fn markup_depth(el: ElementRef<'_>, depth_attr: &str, container: &Selector) -> usize {
    if let Some(depth) = el
        .value()
        .attr(depth_attr)
        .and_then(|v| v.trim().parse::<usize>().ok())
    {
        return depth;
    }

    el.ancestors()
        .filter_map(ElementRef::wrap)
        .filter(|ancestor| container.matches(ancestor))
        .count()
        .saturating_sub(1)
}

/// Strip tags, decode entities and collapse whitespace.
pub fn plain_text(html: &str) -> String {
    let without_tags = TAGS.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    SPACES.replace_all(decoded.trim(), " ").into_owned()
}

/// Cut `s` to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
