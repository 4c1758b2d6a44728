use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::comment::should_expand;
use crate::domain::{Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::{check_feed, hash_short_id, timefmt, Source, StoryCache};

pub const SITE_URL: &str = "https://dev.to";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; feedme/1.0)";
const MIN_DELAY: Duration = Duration::from_millis(500);

const FEED_NAMES: &[&str] = &["top", "latest", "rising", "week"];
const FEED_LABELS: &[&str] = &["Top", "Latest", "Rising", "Week"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct User {
    username: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Article {
    id: ItemId,
    title: String,
    url: String,
    path: String,
    published_at: Option<String>,
    public_reactions_count: i64,
    comments_count: u32,
    tag_list: Vec<String>,
    user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComment {
    id_code: String,
    body_html: String,
    created_at: String,
    user: User,
    children: Vec<RawComment>,
}

/// DEV Community over its public articles API.
///
/// Items keep the real article id, which names the comment thread, and the
/// site path in `Item::kind`.
pub struct DevtoSource {
    fetcher: HttpFetcher,
    cache: StoryCache,
    site_url: String,
}

impl DevtoSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.throttled(MIN_DELAY),
            cache: StoryCache::new(),
            site_url: SITE_URL.to_string(),
        })
    }

    /// Point both the site and its `/api` at another host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.site_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_fetcher(mut self, fetcher: HttpFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    fn articles_url(&self, feed: &str) -> String {
        let filter = match feed {
            "latest" => "&state=fresh",
            "rising" => "&state=rising",
            "week" => "&top=7",
            _ => "",
        };
        format!("{}/api/articles?per_page=50{}", self.site_url, filter)
    }
}

fn to_item(article: Article) -> Item {
    Item {
        id: article.id,
        kind: article.path,
        title: article.title,
        by: article.user.username,
        score: article.public_reactions_count,
        url: article.url,
        time: article
            .published_at
            .as_deref()
            .map_or_else(timefmt::now, timefmt::parse_or_now),
        descendants: article.comments_count,
        text: if article.tag_list.is_empty() {
            String::new()
        } else {
            format!("[{}]", article.tag_list.join(", "))
        },
        ..Default::default()
    }
}

fn comments_at(raw: Vec<RawComment>, depth: usize, max_depth: usize) -> Vec<Comment> {
    raw.into_iter()
        .filter(|c| !c.user.username.is_empty())
        .map(|c| {
            let children = if should_expand(depth, max_depth) {
                comments_at(c.children, depth + 1, max_depth)
            } else {
                Vec::new()
            };
            Comment {
                item: Item {
                    id: hash_short_id(&c.id_code),
                    kind: "comment".to_string(),
                    by: c.user.username,
                    text: c.body_html,
                    time: timefmt::parse_or_now(&c.created_at),
                    ..Default::default()
                },
                depth,
                children,
            }
        })
        .collect()
}

#[async_trait]
impl Source for DevtoSource {
    fn name(&self) -> String {
        "DEV".to_string()
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS
    }

    #[instrument(skip(self))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        check_feed(FEED_NAMES, feed)?;

        let body = self.fetcher.fetch(&self.articles_url(feed)).await?;
        let articles: Vec<Article> = serde_json::from_slice(&body)?;
        let stories: Vec<Item> = articles
            .into_iter()
            .map(to_item)
            .filter(Item::has_title)
            .collect();

        if stories.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = stories.len(), "Fetched articles");
        Ok(self.cache.replace(stories))
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        self.cache.get(id)
    }

    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        Ok(self.cache.get_many(ids))
    }

    #[instrument(skip(self, item), fields(article = item.id))]
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>> {
        if item.id == 0 {
            return Err(FeedmeError::MissingThread(item.id));
        }
        let url = format!("{}/api/comments?a_id={}", self.site_url, item.id);
        let body = self.fetcher.fetch(&url).await?;
        let raw: Vec<RawComment> = serde_json::from_slice(&body)?;
        Ok(comments_at(raw, 0, max_depth))
    }

    fn story_url(&self, item: &Item) -> String {
        if item.kind.starts_with('/') {
            format!("{}{}", self.site_url, item.kind)
        } else {
            item.url.clone()
        }
    }
}
