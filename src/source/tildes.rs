use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::{comment, Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::markup::{self, selector};
use crate::source::{check_feed, hash_short_id, Source, StoryCache};

pub const BASE_URL: &str = "https://tildes.net";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; feedme/1.0)";
const MIN_DELAY: Duration = Duration::from_millis(500);
const PAGES: u32 = 2;

const FEED_NAMES: &[&str] = &["activity", "new", "votes", "comments"];
const FEED_LABELS: &[&str] = &["Activity", "New", "Votes", "Comments"];

static TOPIC: Lazy<Selector> = Lazy::new(|| selector("article.topic"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("a.topic-title, h1.topic-title a"));
static VOTES: Lazy<Selector> = Lazy::new(|| selector(".topic-voting-votes"));
static COMMENTS_LINK: Lazy<Selector> = Lazy::new(|| selector(".topic-info-comments a"));
static SOURCE: Lazy<Selector> = Lazy::new(|| selector(".topic-info-source a"));
static TIME: Lazy<Selector> = Lazy::new(|| selector("time"));
static GROUP: Lazy<Selector> = Lazy::new(|| selector(".topic-group a"));
static TAG: Lazy<Selector> = Lazy::new(|| selector(".topic-tags a.label-topic-tag"));
static COMMENT: Lazy<Selector> = Lazy::new(|| selector("article.comment"));
static COMMENT_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(".comment-header a.link-user"));
static COMMENT_TEXT: Lazy<Selector> = Lazy::new(|| selector(".comment-text"));
static COMMENT_TIME: Lazy<Selector> =
    Lazy::new(|| selector(".comment-posted-time time, time.comment-posted-time"));
static COMMENT_VOTES: Lazy<Selector> = Lazy::new(|| selector(".comment-votes"));
static REPLY_LIST: Lazy<Selector> = Lazy::new(|| selector("ol.comment-tree"));

/// Tildes, optionally narrowed to one `~group`.
///
/// The topic path (`/~group/id36/slug`) is kept in `Item::kind` and is both
/// the story URL and the comment thread.
pub struct TildesSource {
    fetcher: HttpFetcher,
    cache: StoryCache,
    base_url: String,
    group: Option<String>,
}

impl TildesSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.throttled(MIN_DELAY),
            cache: StoryCache::new(),
            base_url: BASE_URL.to_string(),
            group: None,
        })
    }

    pub fn with_group(group: &str, timeout: Duration) -> Result<Self> {
        let group = group.trim().trim_start_matches('~');
        let mut source = Self::new(timeout)?;
        source.group = (!group.is_empty()).then(|| group.to_string());
        Ok(source)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_fetcher(mut self, fetcher: HttpFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    fn page_url(&self, feed: &str, page: u32) -> String {
        let mut url = match &self.group {
            Some(group) => format!("{}/~{}", self.base_url, group),
            None => self.base_url.clone(),
        };

        let mut params = Vec::new();
        if feed != "activity" {
            params.push(format!("order={}", feed));
        }
        if page > 1 {
            params.push(format!("page={}", page));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }

    async fn fetch_page(&self, feed: &str, page: u32) -> Result<Vec<Item>> {
        let body = self.fetcher.fetch(&self.page_url(feed, page)).await?;
        Ok(parse_topics(&String::from_utf8_lossy(&body), &self.base_url))
    }
}

pub fn parse_topics(html: &str, base_url: &str) -> Vec<Item> {
    let doc = Html::parse_document(html);
    doc.select(&TOPIC)
        .filter_map(|el| parse_topic(el, base_url))
        .collect()
}

fn parse_topic(el: ElementRef<'_>, base_url: &str) -> Option<Item> {
    let title_link = markup::first(el, &TITLE)?;
    let title = markup::text_of(title_link);
    if title.is_empty() {
        return None;
    }
    let href = title_link.value().attr("href").unwrap_or_default();

    let id36 = el
        .value()
        .attr("id")
        .and_then(|id| id.strip_prefix("topic-"))
        .unwrap_or_default();
    let group = markup::first_text(el, &GROUP);

    let mut item = Item {
        id: hash_short_id(id36),
        kind: topic_path(el, href, id36, group.as_deref()),
        title,
        url: if href.is_empty() {
            String::new()
        } else {
            markup::absolutize(base_url, href)
        },
        time: markup::time_of(el, &TIME),
        ..Default::default()
    };

    item.score = markup::first_text(el, &VOTES)
        .and_then(|s| markup::exact_number(&s))
        .unwrap_or(0);
    item.descendants = markup::first_text(el, &COMMENTS_LINK)
        .and_then(|s| markup::first_number(&s))
        .unwrap_or(0) as u32;
    item.by = match el.value().attr("data-topic-posted-by") {
        Some(author) => author.to_string(),
        None => markup::first_text(el, &SOURCE).unwrap_or_default(),
    };

    let mut text = group.map(|g| format!("[{}]", g)).unwrap_or_default();
    let tags: Vec<String> = el
        .select(&TAG)
        .map(markup::text_of)
        .filter(|t| !t.is_empty())
        .collect();
    if !tags.is_empty() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(&tags.join(", "));
    }
    item.text = text;

    Some(item)
}

/// Site-relative path of the topic's own page.
///
/// Link topics point their title at the external article, so the comments
/// link is preferred. Without either, the path is rebuilt from group and id.
fn topic_path(el: ElementRef<'_>, title_href: &str, id36: &str, group: Option<&str>) -> String {
    let comments_href = markup::first(el, &COMMENTS_LINK)
        .and_then(|a| a.value().attr("href"))
        .unwrap_or_default();

    if comments_href.starts_with('/') {
        comments_href.to_string()
    } else if title_href.starts_with('/') {
        title_href.to_string()
    } else if let (Some(group), false) = (group, id36.is_empty()) {
        format!("/{}/{}", group, id36)
    } else {
        id36.to_string()
    }
}

fn own<'a>(el: ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    markup::first_own(el, sel, &COMMENT)
}

/// Comments in page order, nested by `data-comment-depth`, falling back to
/// counting enclosing `ol.comment-tree` lists.
///
/// Replies sit inside their parent's `article`, so every field is read from
/// the parent's own markup only. A deleted comment with replies stays as a
/// `[deleted]` placeholder to keep the thread shape.
pub fn parse_comments(html: &str, max_depth: usize) -> Vec<Comment> {
    let doc = Html::parse_document(html);
    let flat = doc
        .select(&COMMENT)
        .filter_map(|el| {
            let mut item = Item {
                id: el
                    .value()
                    .attr("id")
                    .and_then(|id| id.strip_prefix("comment-"))
                    .map(hash_short_id)
                    .unwrap_or(0),
                kind: "comment".to_string(),
                by: own(el, &COMMENT_AUTHOR)
                    .map(markup::text_of)
                    .unwrap_or_default(),
                text: own(el, &COMMENT_TEXT)
                    .map(|t| t.inner_html().trim().to_string())
                    .unwrap_or_default(),
                time: markup::time_at(own(el, &COMMENT_TIME)),
                score: own(el, &COMMENT_VOTES)
                    .and_then(|votes| markup::first_number(&markup::text_of(votes)))
                    .unwrap_or(0),
                ..Default::default()
            };
            if item.by.is_empty() && item.text.is_empty() {
                if el.select(&COMMENT).next().is_none() {
                    return None;
                }
                item.by = "[deleted]".to_string();
            }
            Some(Comment::new(
                item,
                markup::markup_depth(el, "data-comment-depth", &REPLY_LIST),
            ))
        })
        .collect();

    comment::assemble(flat, max_depth)
}

#[async_trait]
impl Source for TildesSource {
    fn name(&self) -> String {
        match &self.group {
            Some(group) => format!("Tildes ~{}", group),
            None => "Tildes".to_string(),
        }
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS
    }

    #[instrument(skip(self), fields(group = ?self.group))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        check_feed(FEED_NAMES, feed)?;

        let mut topics = Vec::new();
        for page in 1..=PAGES {
            match self.fetch_page(feed, page).await {
                Ok(items) => topics.extend(items),
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Stopping pagination early");
                    break;
                }
            }
        }

        if topics.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = topics.len(), "Fetched topics");
        Ok(self.cache.replace(topics))
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        self.cache.get(id)
    }

    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        Ok(self.cache.get_many(ids))
    }

    #[instrument(skip(self, item), fields(thread = %item.kind))]
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>> {
        if !item.kind.starts_with('/') {
            return Err(FeedmeError::MissingThread(item.id));
        }
        let url = format!("{}{}", self.base_url, item.kind);
        let body = self.fetcher.fetch(&url).await?;
        Ok(parse_comments(&String::from_utf8_lossy(&body), max_depth))
    }

    fn story_url(&self, item: &Item) -> String {
        if item.kind.starts_with('/') {
            format!("{}{}", self.base_url, item.kind)
        } else {
            item.url.clone()
        }
    }
}
