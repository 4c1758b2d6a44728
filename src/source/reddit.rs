use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::comment::should_expand;
use crate::domain::{Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::source::{check_feed, hash_short_id, Source, StoryCache};

pub const BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = "feedme:v1.0 (terminal news reader)";
const MIN_DELAY: Duration = Duration::from_secs(1);

const FEED_NAMES: &[&str] = &["hot", "new", "top", "rising", "best"];
const FEED_LABELS: &[&str] = &["Hot", "New", "Top", "Rising", "Best"];

#[derive(Debug, Default, Deserialize)]
struct Listing {
    #[serde(default)]
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    #[serde(default)]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    id: String,
    title: String,
    author: String,
    score: i64,
    url: String,
    permalink: String,
    num_comments: u32,
    created_utc: f64,
    is_self: bool,
    link_flair_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawComment {
    id: String,
    author: String,
    body: String,
    score: i64,
    created_utc: f64,
    replies: Replies,
}

/// Reddit sends `""` for a comment without replies.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Replies {
    Listing(Listing),
    Empty(serde_json::Value),
}

impl Default for Replies {
    fn default() -> Self {
        Replies::Empty(serde_json::Value::Null)
    }
}

/// One subreddit over Reddit's public JSON endpoints.
///
/// The post permalink (`/r/<sub>/comments/...`) is kept in `Item::kind`.
pub struct RedditSource {
    fetcher: HttpFetcher,
    cache: StoryCache,
    base_url: String,
    subreddit: String,
}

impl RedditSource {
    pub fn new(subreddit: &str, timeout: Duration) -> Result<Self> {
        let subreddit = subreddit.trim();
        let subreddit = subreddit
            .strip_prefix("/r/")
            .or_else(|| subreddit.strip_prefix("r/"))
            .unwrap_or(subreddit)
            .trim_end_matches('/');

        Ok(Self {
            fetcher: HttpFetcher::with_timeout(USER_AGENT, timeout)?.throttled(MIN_DELAY),
            cache: StoryCache::new(),
            base_url: BASE_URL.to_string(),
            subreddit: subreddit.to_string(),
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

    fn permalink_url(&self, permalink: &str) -> String {
        format!("{}{}", self.base_url, permalink)
    }

    fn to_item(&self, post: Post) -> Item {
        Item {
            id: hash_short_id(&post.id),
            url: if post.is_self {
                self.permalink_url(&post.permalink)
            } else {
                post.url
            },
            kind: post.permalink,
            title: post.title,
            by: post.author,
            score: post.score,
            time: post.created_utc as i64,
            descendants: post.num_comments,
            text: post
                .link_flair_text
                .filter(|flair| !flair.is_empty())
                .map(|flair| format!("[{}]", flair))
                .unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Turn a listing's `t1` children into comments at `depth`.
fn comments_at(listing: Listing, depth: usize, max_depth: usize) -> Vec<Comment> {
    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t1")
        .filter_map(|thing| match serde_json::from_value::<RawComment>(thing.data) {
            Ok(raw) => Some(raw),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping malformed comment");
                None
            }
        })
        .filter(|raw| !raw.author.is_empty() && raw.author != "[deleted]")
        .map(|raw| {
            let children = match raw.replies {
                Replies::Listing(replies) if should_expand(depth, max_depth) => {
                    comments_at(replies, depth + 1, max_depth)
                }
                _ => Vec::new(),
            };
            Comment {
                item: Item {
                    id: hash_short_id(&raw.id),
                    kind: "comment".to_string(),
                    by: raw.author,
                    text: raw.body,
                    score: raw.score,
                    time: raw.created_utc as i64,
                    ..Default::default()
                },
                depth,
                children,
            }
        })
        .collect()
}

#[async_trait]
impl Source for RedditSource {
    fn name(&self) -> String {
        format!("r/{}", self.subreddit)
    }

    fn feed_names(&self) -> &'static [&'static str] {
        FEED_NAMES
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        FEED_LABELS
    }

    #[instrument(skip(self), fields(subreddit = %self.subreddit))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        check_feed(FEED_NAMES, feed)?;

        let url = format!(
            "{}/r/{}/{}.json?limit=100",
            self.base_url, self.subreddit, feed
        );
        let body = self.fetcher.fetch(&url).await?;
        let listing: Listing = serde_json::from_slice(&body)?;

        let stories: Vec<Item> = listing
            .data
            .children
            .into_iter()
            .filter_map(|thing| serde_json::from_value::<Post>(thing.data).ok())
            .map(|post| self.to_item(post))
            .filter(Item::has_title)
            .collect();

        if stories.is_empty() {
            return Err(FeedmeError::NoContent(format!("r/{}/{}", self.subreddit, feed)));
        }
        tracing::info!(count = stories.len(), "Fetched posts");
        Ok(self.cache.replace(stories))
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        self.cache.get(id)
    }

    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        Ok(self.cache.get_many(ids))
    }

    #[instrument(skip(self, item), fields(permalink = %item.kind))]
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>> {
        if !item.kind.starts_with("/r/") {
            return Err(FeedmeError::MissingThread(item.id));
        }

        let url = format!("{}.json?limit=200", self.permalink_url(item.kind.trim_end_matches('/')));
        let body = self.fetcher.fetch(&url).await?;

        // [post listing, comment listing]
        let mut listings: Vec<Listing> = serde_json::from_slice(&body)?;
        if listings.len() < 2 {
            return Err(FeedmeError::Parse(format!(
                "expected post and comment listings, got {}",
                listings.len()
            )));
        }
        let comments = comments_at(listings.swap_remove(1), 0, max_depth);
        tracing::info!(roots = comments.len(), "Fetched comment tree");
        Ok(comments)
    }

    fn story_url(&self, item: &Item) -> String {
        if item.kind.starts_with("/r/") {
            self.permalink_url(&item.kind)
        } else {
            item.url.clone()
        }
    }
}
