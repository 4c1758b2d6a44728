//! The provider-neutral content contract and its adapters.

pub mod apnews;
pub mod cache;
pub mod devto;
pub mod hacker_news;
pub mod lobsters;
pub mod markup;
pub mod news;
pub mod reddit;
pub mod rss;
pub mod tildes;
pub mod timefmt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{FeedmeError, Result};
use crate::config::NetworkConfig;
use crate::domain::{Comment, Item, ItemId};

pub use apnews::ApNewsSource;
pub use cache::StoryCache;
pub use devto::DevtoSource;
pub use hacker_news::HackerNewsSource;
pub use lobsters::LobstersSource;
pub use news::{NewsProvider, NewsSource};
pub use reddit::RedditSource;
pub use rss::RssSource;
pub use tildes::TildesSource;

/// The only interface the UI and CLI depend on.
#[async_trait]
pub trait Source: Send + Sync {
    /// Display label; may include dynamic context such as a community name.
    fn name(&self) -> String;

    /// Routing keys of the available feeds. Never empty.
    fn feed_names(&self) -> &'static [&'static str];

    /// Human labels, parallel to [`feed_names`](Source::feed_names).
    fn feed_labels(&self) -> &'static [&'static str];

    /// List the stories of a feed, refreshing any internal snapshot.
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>>;

    /// Fails with [`FeedmeError::ItemNotFound`] for ids outside the current snapshot.
    async fn fetch_item(&self, id: ItemId) -> Result<Item>;

    /// One slot per id, in input order.
    async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>>;

    /// Root comments of `item`. `max_depth == 0` means unlimited; otherwise
    /// nodes at `max_depth` are kept but not expanded.
    async fn fetch_comment_tree(&self, item: &Item, max_depth: usize) -> Result<Vec<Comment>>;

    /// Browsable URL for `item`, derived without any I/O.
    fn story_url(&self, item: &Item) -> String;

    fn feed_label(&self, feed: &str) -> Option<&'static str> {
        self.feed_names()
            .iter()
            .position(|name| *name == feed)
            .and_then(|i| self.feed_labels().get(i).copied())
    }

    fn default_feed(&self) -> &'static str {
        self.feed_names().first().copied().unwrap_or_default()
    }
}

/// Deterministic pseudo-numeric id for a provider short id.
pub fn hash_short_id(short_id: &str) -> ItemId {
    short_id
        .chars()
        .enumerate()
        .fold(0, |hash: ItemId, (i, c)| {
            hash.wrapping_add((c as ItemId) * (i as ItemId + 1) * 31)
        })
}

pub(crate) fn check_feed(names: &[&str], feed: &str) -> Result<()> {
    if names.contains(&feed) {
        Ok(())
    } else {
        Err(FeedmeError::UnknownFeed(feed.to_string()))
    }
}

/// Resolve a batch of story ids into displayable stories, in order.
///
/// A partially failed batch still yields the stories that loaded; only a
/// batch where nothing loaded is an error. Empty slots, untitled stories and
/// deleted or dead ones are skipped.
pub async fn load_stories(source: &dyn Source, ids: &[ItemId]) -> Result<Vec<Item>> {
    let slots = match source.fetch_items(ids).await {
        Ok(slots) => slots,
        Err(FeedmeError::PartialBatch { items, first }) if items.iter().any(Option::is_some) => {
            tracing::warn!(error = %first, "Some stories failed to load");
            items
        }
        Err(FeedmeError::PartialBatch { first, .. }) => return Err(*first),
        Err(e) => return Err(e),
    };

    Ok(slots
        .into_iter()
        .flatten()
        .filter(|item| !item.is_suppressed() && item.has_title())
        .collect())
}

/// Keys accepted by [`open`], with a short description each.
pub const ROSTER: &[(&str, &str)] = &[
    ("hn", "Hacker News"),
    ("lobsters", "Lobsters"),
    ("tildes", "Tildes (use ~group for a single group)"),
    ("r/<name>", "A subreddit"),
    ("devto", "DEV Community"),
    ("ap", "AP News"),
    ("bbc", "BBC News"),
    ("npr", "NPR"),
    ("google", "Google News"),
    ("reuters", "Reuters"),
    ("guardian", "The Guardian"),
    ("<url>", "Any RSS or Atom feed (also rss:<url>)"),
];

/// Construct the adapter named by `spec`.
pub fn open(spec: &str, network: &NetworkConfig) -> Result<Arc<dyn Source>> {
    let spec = spec.trim();
    let timeout = Duration::from_secs(network.timeout_secs);
    let lowered = spec.to_lowercase();

    let source: Arc<dyn Source> = match lowered.as_str() {
        "hn" | "hackernews" | "hacker-news" => {
            Arc::new(HackerNewsSource::new(timeout, network.workers)?)
        }
        "lobsters" | "lobste.rs" | "l" => Arc::new(LobstersSource::new(timeout)?),
        "tildes" => Arc::new(TildesSource::new(timeout)?),
        "devto" | "dev" | "dev.to" => Arc::new(DevtoSource::new(timeout)?),
        "ap" | "apnews" | "ap-news" => Arc::new(ApNewsSource::new(timeout)?),
        _ => {
            if let Some(provider) = NewsProvider::lookup(&lowered) {
                Arc::new(NewsSource::new(provider, timeout)?)
            } else if let Some(group) = spec.strip_prefix('~') {
                Arc::new(TildesSource::with_group(group, timeout)?)
            } else if lowered.starts_with("r/") || lowered.starts_with("/r/") {
                Arc::new(RedditSource::new(spec, timeout)?)
            } else if let Some(url) = spec.strip_prefix("rss:") {
                Arc::new(RssSource::new(url, timeout)?)
            } else if lowered.starts_with("http://") || lowered.starts_with("https://") {
                Arc::new(RssSource::new(spec, timeout)?)
            } else {
                return Err(FeedmeError::UnknownSource(spec.to_string()));
            }
        }
    };

    tracing::debug!(source = %source.name(), "Opened source");
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_short_id_is_deterministic() {
        assert_eq!(hash_short_id("abc123"), hash_short_id("abc123"));
        assert_ne!(hash_short_id("abc123"), hash_short_id("321cba"));
        // 'a' * 1 * 31 + 'b' * 2 * 31
        assert_eq!(hash_short_id("ab"), 97 * 31 + 98 * 2 * 31);
        assert_eq!(hash_short_id(""), 0);
    }

    #[test]
    fn test_open_known_sources() {
        let network = NetworkConfig::default();
        let cases = [
            ("hn", "HN"),
            ("Lobsters", "Lobsters"),
            ("tildes", "Tildes"),
            ("~comp", "Tildes ~comp"),
            ("r/rust", "r/rust"),
            ("/r/golang", "r/golang"),
            ("devto", "DEV"),
            ("ap", "AP News"),
            ("bbc", "BBC"),
            ("npr", "NPR"),
            ("google", "Google News"),
            ("reuters", "Reuters"),
            ("guardian", "The Guardian"),
            ("https://example.com/feed.xml", "example.com"),
            ("rss:https://blog.example.org/atom", "blog.example.org"),
        ];
        for (spec, name) in cases {
            let source = open(spec, &network).unwrap();
            assert_eq!(source.name(), name, "{}", spec);
        }
    }

    struct Flaky;

    #[async_trait]
    impl Source for Flaky {
        fn name(&self) -> String {
            "flaky".to_string()
        }
        fn feed_names(&self) -> &'static [&'static str] {
            &["all"]
        }
        fn feed_labels(&self) -> &'static [&'static str] {
            &["All"]
        }
        async fn fetch_story_ids(&self, _feed: &str) -> Result<Vec<ItemId>> {
            Ok(vec![1, 2, 3])
        }
        async fn fetch_item(&self, id: ItemId) -> Result<Item> {
            Err(FeedmeError::ItemNotFound(id))
        }
        async fn fetch_items(&self, ids: &[ItemId]) -> Result<Vec<Option<Item>>> {
            let items: Vec<Option<Item>> = ids
                .iter()
                .map(|&id| {
                    (id % 2 == 1).then(|| Item {
                        id,
                        title: if id == 5 { " ".to_string() } else { format!("story {}", id) },
                        dead: id == 3,
                        ..Default::default()
                    })
                })
                .collect();
            if ids.iter().all(|id| id % 2 == 1) {
                return Ok(items);
            }
            Err(FeedmeError::PartialBatch {
                items,
                first: Box::new(FeedmeError::ItemNotFound(2)),
            })
        }
        async fn fetch_comment_tree(&self, _item: &Item, _max: usize) -> Result<Vec<Comment>> {
            Ok(Vec::new())
        }
        fn story_url(&self, _item: &Item) -> String {
            String::new()
        }
    }

    #[tokio::test]
    async fn test_load_stories_tolerates_partial_batches() {
        let stories = load_stories(&Flaky, &[1, 2, 3, 5]).await.unwrap();
        let ids: Vec<ItemId> = stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1], "missing, dead and untitled stories are skipped");

        let stories = load_stories(&Flaky, &[5, 1]).await.unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "story 1");

        assert!(load_stories(&Flaky, &[2]).await.unwrap_err().is_not_found());
        assert!(load_stories(&Flaky, &[]).await.unwrap().is_empty());
    }

    #[test]
    fn test_open_unknown_source() {
        let err = open("myspace", &NetworkConfig::default()).err().unwrap();
        assert!(matches!(err, FeedmeError::UnknownSource(_)));
    }

    #[test]
    fn test_every_source_has_parallel_feed_tables() {
        let network = NetworkConfig::default();
        for spec in [
            "hn", "lobsters", "tildes", "r/rust", "devto", "ap", "bbc", "npr", "google",
            "reuters", "guardian", "https://example.com/rss",
        ] {
            let source = open(spec, &network).unwrap();
            assert!(!source.feed_names().is_empty(), "{}", spec);
            assert_eq!(
                source.feed_names().len(),
                source.feed_labels().len(),
                "{}",
                spec
            );
            assert!(source.feed_names().iter().all(|f| !f.is_empty()), "{}", spec);
            assert_eq!(
                source.feed_label(source.default_feed()),
                source.feed_labels().first().copied()
            );
        }
    }
}
