use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::{Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::markup::{self, selector};
use crate::source::{hash_short_id, timefmt, Source, StoryCache};

pub const BASE_URL: &str = "https://apnews.com";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; feedme/1.0)";
const MIN_DELAY: Duration = Duration::from_millis(500);
const MAX_STORIES: usize = 50;

/// Feed key, tab label and site path.
const FEEDS: &[(&str, &str, &str)] = &[
    ("top", "Top", ""),
    ("world", "World", "/world-news"),
    ("us", "US", "/us-news"),
    ("politics", "Politics", "/politics"),
    ("business", "Business", "/business"),
    ("tech", "Tech", "/technology"),
    ("science", "Science", "/science"),
    ("health", "Health", "/health"),
    ("sports", "Sports", "/sports"),
    ("entertain", "Arts", "/entertainment"),
];
static FEED_NAMES: Lazy<Vec<&'static str>> =
    Lazy::new(|| FEEDS.iter().map(|(name, _, _)| *name).collect());
static FEED_LABELS: Lazy<Vec<&'static str>> =
    Lazy::new(|| FEEDS.iter().map(|(_, label, _)| *label).collect());

fn feed_path(feed: &str) -> Option<&'static str> {
    FEEDS
        .iter()
        .find(|(name, _, _)| *name == feed)
        .map(|(_, _, path)| *path)
}

/// Headline anchors, most specific first. Later patterns only add links the
/// earlier ones missed.
static HEADLINES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "a[data-key='card-headline']",
        "a.Link[href*='/article/']",
        "div.PagePromo a[href*='/article/']",
        "h2 a[href*='/article/']",
        "h3 a[href*='/article/']",
    ]
    .into_iter()
    .map(selector)
    .collect()
});
static SPAN: Lazy<Selector> = Lazy::new(|| selector("span"));

/// AP News section fronts, scraped for headlines. There are no comments.
pub struct ApNewsSource {
    fetcher: HttpFetcher,
    cache: StoryCache,
    base_url: String,
}

impl ApNewsSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.throttled(MIN_DELAY),
            cache: StoryCache::new(),
            base_url: BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_fetcher(mut self, fetcher: HttpFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }
}

/// Headlines in selector order, deduplicated by absolute URL.
pub fn parse_headlines(html: &str, base_url: &str) -> Vec<Item> {
    let doc = Html::parse_document(html);
    let fetched_at = timefmt::now();
    let mut seen = HashSet::new();
    let mut stories = Vec::new();

    for sel in HEADLINES.iter() {
        for link in doc.select(sel) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let url = markup::absolutize(base_url, href);
            if seen.contains(&url) {
                continue;
            }

            let mut title = markup::text_of(link);
            if title.is_empty() {
                title = markup::first_text(link, &SPAN).unwrap_or_default();
            }
            if title.is_empty() {
                continue;
            }
            seen.insert(url.clone());

            stories.push(Item {
                id: hash_short_id(&url),
                kind: url.clone(),
                title,
                url,
                by: "AP".to_string(),
                time: fetched_at,
                ..Default::default()
            });
        }
    }

    stories.truncate(MAX_STORIES);
    stories
}

#[async_trait]
impl Source for ApNewsSource {
    fn name(&self) -> String {
        "AP News".to_string()
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES.as_slice()
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS.as_slice()
    }

    #[instrument(skip(self))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        let path = feed_path(feed).ok_or_else(|| FeedmeError::UnknownFeed(feed.to_string()))?;

        let body = self.fetcher.fetch(&format!("{}{}", self.base_url, path)).await?;
        let stories = parse_headlines(&String::from_utf8_lossy(&body), &self.base_url);

        if stories.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = stories.len(), "Fetched headlines");
        Ok(self.cache.replace(stories))
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        self.cache.get(id)
    }

    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        Ok(self.cache.get_many(ids))
    }

    async fn fetch_comment_tree(&self, _item: &Item, _max_depth: usize) -> Result<Vec<Comment>> {
        Ok(Vec::new())
    }

    fn story_url(&self, item: &Item) -> String {
        item.url.clone()
    }
}
