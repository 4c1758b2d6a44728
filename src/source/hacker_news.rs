use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use tracing::instrument;

use crate::app::{FeedmeError, Result};
use crate::domain::comment::should_expand;
use crate::domain::{Comment, Item, ItemId};
use crate::fetcher::{Fetcher, HttpFetcher, ParallelFetcher};
use crate::source::{check_feed, Source};

pub const BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";
const SITE_URL: &str = "https://news.ycombinator.com";
const USER_AGENT: &str = concat!("feedme/", env!("CARGO_PKG_VERSION"));

const FEED_NAMES: &[&str] = &[
    "topstories",
    "newstories",
    "beststories",
    "askstories",
    "showstories",
];
const FEED_LABELS: &[&str] = &["Top", "New", "Best", "Ask", "Show"];

/// Hacker News over the Firebase JSON API.
///
/// Ids are globally addressable, so nothing is cached. Batch lookups fan
/// out over a bounded worker pool.
pub struct HackerNewsSource {
    fetcher: Arc<dyn Fetcher>,
    pool: ParallelFetcher,
    base_url: String,
}

impl HackerNewsSource {
    pub fn new(timeout: Duration, workers: usize) -> Result<Self> {
        let fetcher = HttpFetcher::with_timeout(USER_AGENT, timeout)?;
        Ok(Self::with_fetcher(Arc::new(fetcher), BASE_URL, workers))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>, base_url: &str, workers: usize) -> Self {
        Self {
            fetcher,
            pool: ParallelFetcher::with_workers(workers),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn comment_level(
        &self,
        ids: Vec<ItemId>,
        depth: usize,
        max_depth: usize,
    ) -> BoxFuture<'_, Result<Vec<Comment>>> {
        async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let items = match self.fetch_items(&ids).await {
                Ok(items) => items,
                Err(FeedmeError::PartialBatch { items, first })
                    if items.iter().any(Option::is_some) =>
                {
                    tracing::warn!(depth, error = %first, "Some comments failed to load");
                    items
                }
                Err(e) => return Err(e),
            };

            let visible: Vec<Item> = items
                .into_iter()
                .flatten()
                .filter(|item| !item.is_suppressed())
                .collect();

            let subtrees = visible.iter().map(|item| {
                let kids = item.kids.clone();
                async move {
                    if kids.is_empty() || !should_expand(depth, max_depth) {
                        return Vec::new();
                    }
                    match self.comment_level(kids, depth + 1, max_depth).await {
                        Ok(children) => children,
                        Err(e) => {
                            tracing::warn!(parent = item.id, error = %e, "Dropping comment branch");
                            Vec::new()
                        }
                    }
                }
            });
            let children = join_all(subtrees).await;

            Ok(visible
                .into_iter()
                .zip(children)
                .map(|(item, children)| Comment {
                    item,
                    depth,
                    children,
                })
                .collect())
        }
        .boxed()
    }
}

async fn fetch_item_at(fetcher: &dyn Fetcher, url: &str, id: ItemId) -> Result<Item> {
    let body = fetcher.fetch(url).await?;
    // deleted-and-purged items come back as a JSON `null`
    serde_json::from_slice::<Option<Item>>(&body)?.ok_or(FeedmeError::ItemNotFound(id))
}

#[async_trait]
impl Source for HackerNewsSource {
    fn name(&self) -> String {
        "HN".to_string()
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
        let url = format!("{}/{}.json", self.base_url, feed);
        let body = self.fetcher.fetch(&url).await?;
        let ids: Vec<ItemId> = serde_json::from_slice(&body)?;
        tracing::info!(count = ids.len(), "Fetched story ids");
        Ok(ids)
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        fetch_item_at(self.fetcher.as_ref(), &url, id).await
    }

    /// Surfaces [`FeedmeError::PartialBatch`] when any lookup fails, carrying
    /// the slots that did resolve and the first failure in input order.
    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
        let fetcher = self.fetcher.clone();
        let base_url = self.base_url.clone();

        let results = self
            .pool
            .fetch_all(ids.to_vec(), move |id| {
                let fetcher = fetcher.clone();
                let url = format!("{}/item/{}.json", base_url, id);
                async move { fetch_item_at(fetcher.as_ref(), &url, id).await }
            })
            .await;

        let mut items = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(item) => items.push(Some(item)),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                    items.push(None);
                }
            }
        }

        match first_error {
            None => Ok(items),
            Some(first) => Err(FeedmeError::PartialBatch {
                items,
                first: Box::new(first),
            }),
        }
    }

    #[instrument(skip(self, item), fields(id = item.id))]
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>> {
        let comments = self.comment_level(item.kids.clone(), 0, max_depth).await?;
        tracing::info!(roots = comments.len(), "Fetched comment tree");
        Ok(comments)
    }

    fn story_url(&self, item: &Item) -> String {
        format!("{}/item?id={}", SITE_URL, item.id)
    }
}
