use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::{Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::{hash_short_id, markup, timefmt, Source, StoryCache};

const USER_AGENT: &str = "feedme/1.0 (Terminal RSS Reader)";
const ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml, text/xml";
const SUMMARY_LEN: usize = 300;
const NAME_LEN: usize = 20;

const FEED_NAMES: &[&str] = &["feed"];
const FEED_LABELS: &[&str] = &["Items"];

/// A parsed feed document.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub title: String,
    pub items: Vec<Item>,
}

/// Fetches and normalizes RSS 2.0 or Atom documents.
pub struct FeedReader {
    fetcher: HttpFetcher,
}

impl FeedReader {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.accept(ACCEPT),
        })
    }

    /// Read `url` as RSS, then with a fresh request as Atom when RSS yields
    /// no items. Only a failure of both parses is an error.
    #[instrument(skip(self))]
    pub async fn read(&self, url: &str) -> Result<ParsedFeed> {
        let body = self.fetcher.fetch(url).await?;
        match parse_rss(&body) {
            Ok(feed) if !feed.items.is_empty() => return Ok(feed),
            Ok(_) => tracing::debug!("No RSS items, trying Atom"),
            Err(e) => tracing::debug!(error = %e, "Not RSS, trying Atom"),
        }

        let body = self.fetcher.fetch(url).await?;
        parse_atom(&body)
    }
}

fn clean(s: &str) -> String {
    html_escape::decode_html_entities(s).trim().to_string()
}

fn summary(html: &str) -> String {
    markup::truncate(&markup::plain_text(html), SUMMARY_LEN)
}

pub fn parse_rss(body: &[u8]) -> Result<ParsedFeed> {
    let channel =
        rss::Channel::read_from(body).map_err(|e| FeedmeError::FeedParse(e.to_string()))?;

    let items = channel
        .items()
        .iter()
        .filter_map(|entry| {
            let title = clean(entry.title().unwrap_or_default());
            if title.is_empty() {
                return None;
            }

            let by = entry
                .author()
                .filter(|a| !a.trim().is_empty())
                .map(str::to_string)
                .or_else(|| {
                    entry
                        .dublin_core_ext()
                        .and_then(|dc| dc.creators().first().cloned())
                })
                .or_else(|| {
                    entry
                        .source()
                        .and_then(|s| s.title())
                        .map(str::to_string)
                })
                .unwrap_or_default();

            let url = entry.link().unwrap_or_default().trim().to_string();
            let kind = entry
                .guid()
                .map(|g| g.value().to_string())
                .filter(|g| !g.is_empty())
                .unwrap_or_else(|| url.clone());

            Some(Item {
                id: hash_short_id(&kind),
                kind,
                title,
                url,
                by: clean(&by),
                time: entry
                    .pub_date()
                    .map(timefmt::parse_or_now)
                    .unwrap_or_else(timefmt::now),
                text: summary(entry.description().or(entry.content()).unwrap_or_default()),
                ..Default::default()
            })
        })
        .collect();

    Ok(ParsedFeed {
        title: clean(channel.title()),
        items,
    })
}

pub fn parse_atom(body: &[u8]) -> Result<ParsedFeed> {
    let feed = feed_rs::parser::parse(body).map_err(|e| FeedmeError::FeedParse(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = clean(&entry.title.map(|t| t.content).unwrap_or_default());
            if title.is_empty() {
                return None;
            }

            let url = entry
                .links
                .iter()
                .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
                .or_else(|| entry.links.first())
                .map(|l| l.href.clone())
                .unwrap_or_default();
            let kind = if entry.id.is_empty() {
                url.clone()
            } else {
                entry.id
            };
            let text = entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            Some(Item {
                id: hash_short_id(&kind),
                kind,
                title,
                url,
                by: entry
                    .authors
                    .first()
                    .map(|p| clean(&p.name))
                    .unwrap_or_default(),
                time: entry
                    .published
                    .or(entry.updated)
                    .map(|t| t.timestamp())
                    .unwrap_or_else(timefmt::now),
                text: summary(&text),
                ..Default::default()
            })
        })
        .collect();

    Ok(ParsedFeed {
        title: clean(&feed.title.map(|t| t.content).unwrap_or_default()),
        items,
    })
}

/// Any single RSS or Atom feed, addressed by URL.
pub struct RssSource {
    reader: FeedReader,
    cache: StoryCache,
    feed_url: String,
    title: RwLock<Option<String>>,
}

impl RssSource {
    pub fn new(feed_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            reader: FeedReader::new(timeout)?,
            cache: StoryCache::new(),
            feed_url: feed_url.trim().to_string(),
            title: RwLock::new(None),
        })
    }
}

#[async_trait]
impl Source for RssSource {
    /// Feed title once known, else the feed's host.
    fn name(&self) -> String {
        let title = self
            .title
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(title) = title {
            return if title.chars().count() > NAME_LEN {
                format!("{}...", title.chars().take(NAME_LEN - 3).collect::<String>())
            } else {
                title
            };
        }

        url::Url::parse(&self.feed_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "RSS".to_string())
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS
    }

    #[instrument(skip(self), fields(url = %self.feed_url))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        let parsed = self.reader.read(&self.feed_url).await?;

        if !parsed.title.is_empty() {
            *self.title.write().unwrap_or_else(PoisonError::into_inner) = Some(parsed.title);
        }
        if parsed.items.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = parsed.items.len(), "Fetched feed items");
        Ok(self.cache.replace(parsed.items))
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
        if item.url.is_empty() {
            self.feed_url.clone()
        } else {
            item.url.clone()
        }
    }
}
