//! Read-only news providers: a fixed table of topic feeds per provider, all
//! read through [`FeedReader`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::instrument;
use url::{Position, Url};

use crate::app::{FeedmeError, Result};
use crate::domain::{Comment, Item, ItemId};
use crate::source::rss::FeedReader;
use crate::source::{check_feed, Source, StoryCache};

pub struct NewsProvider {
    /// Spellings accepted by [`NewsProvider::lookup`].
    pub keys: &'static [&'static str],
    pub name: &'static str,
    pub site_url: &'static str,
    feed_names: &'static [&'static str],
    feed_labels: &'static [&'static str],
    feed_urls: &'static [&'static str],
}

macro_rules! google_topic {
    ($topic:literal) => {
        concat!(
            "https://news.google.com/rss/topics/",
            $topic,
            "?hl=en-US&gl=US&ceid=US:en"
        )
    };
}

pub static PROVIDERS: &[NewsProvider] = &[
    NewsProvider {
        keys: &["bbc", "bbc-news"],
        name: "BBC",
        site_url: "https://www.bbc.com",
        feed_names: &[
            "top", "world", "uk", "business", "tech", "science", "health", "entertain",
        ],
        feed_labels: &[
            "Top", "World", "UK", "Business", "Tech", "Science", "Health", "Arts",
        ],
        feed_urls: &[
            "https://feeds.bbci.co.uk/news/rss.xml",
            "https://feeds.bbci.co.uk/news/world/rss.xml",
            "https://feeds.bbci.co.uk/news/uk/rss.xml",
            "https://feeds.bbci.co.uk/news/business/rss.xml",
            "https://feeds.bbci.co.uk/news/technology/rss.xml",
            "https://feeds.bbci.co.uk/news/science_and_environment/rss.xml",
            "https://feeds.bbci.co.uk/news/health/rss.xml",
            "https://feeds.bbci.co.uk/news/entertainment_and_arts/rss.xml",
        ],
    },
    NewsProvider {
        keys: &["npr"],
        name: "NPR",
        site_url: "https://www.npr.org",
        feed_names: &[
            "news", "world", "us", "politics", "business", "tech", "science", "health", "culture",
        ],
        feed_labels: &[
            "News", "World", "US", "Politics", "Business", "Tech", "Science", "Health", "Culture",
        ],
        feed_urls: &[
            "https://feeds.npr.org/1001/rss.xml",
            "https://feeds.npr.org/1004/rss.xml",
            "https://feeds.npr.org/1003/rss.xml",
            "https://feeds.npr.org/1014/rss.xml",
            "https://feeds.npr.org/1006/rss.xml",
            "https://feeds.npr.org/1019/rss.xml",
            "https://feeds.npr.org/1007/rss.xml",
            "https://feeds.npr.org/1128/rss.xml",
            "https://feeds.npr.org/1008/rss.xml",
        ],
    },
    NewsProvider {
        keys: &["google", "googlenews", "google-news", "gnews"],
        name: "Google News",
        site_url: "https://news.google.com",
        feed_names: &[
            "top", "world", "us", "business", "tech", "science", "health", "sports", "entertain",
        ],
        feed_labels: &[
            "Top", "World", "US", "Business", "Tech", "Science", "Health", "Sports", "Arts",
        ],
        feed_urls: &[
            "https://news.google.com/rss?hl=en-US&gl=US&ceid=US:en",
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx1YlY4U0FtVnVHZ0pWVXlnQVAB"),
            google_topic!("CAAqIggKIhxDQkFTRHdvSkwyMHZNRGxqTjNjd0VnSmxiaWdBUAE"),
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNRGx6TVdZU0FtVnVHZ0pWVXlnQVAB"),
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNRGRqTVhZU0FtVnVHZ0pWVXlnQVAB"),
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNRFp0Y1RjU0FtVnVHZ0pWVXlnQVAB"),
            google_topic!("CAAqIQgKIhtDQkFTRGdvSUwyMHZNR3QwTlRFU0FtVnVLQUFQAQ"),
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNRFp1ZEdvU0FtVnVHZ0pWVXlnQVAB"),
            google_topic!("CAAqJggKIiBDQkFTRWdvSUwyMHZNREpxYW5RU0FtVnVHZ0pWVXlnQVAB"),
        ],
    },
    NewsProvider {
        keys: &["reuters"],
        name: "Reuters",
        site_url: "https://www.reuters.com",
        feed_names: &["world", "business", "tech", "sports", "life"],
        feed_labels: &["World", "Business", "Tech", "Sports", "Life"],
        feed_urls: &[
            "https://www.reutersagency.com/feed/?best-topics=world&post_type=best",
            "https://www.reutersagency.com/feed/?best-topics=business-finance&post_type=best",
            "https://www.reutersagency.com/feed/?best-topics=tech&post_type=best",
            "https://www.reutersagency.com/feed/?best-topics=sports&post_type=best",
            "https://www.reutersagency.com/feed/?best-topics=lifestyle&post_type=best",
        ],
    },
    NewsProvider {
        keys: &["guardian", "theguardian", "the-guardian"],
        name: "The Guardian",
        site_url: "https://www.theguardian.com",
        feed_names: &[
            "top", "world", "uk", "us", "business", "tech", "science", "sport",
        ],
        feed_labels: &[
            "Top", "World", "UK", "US", "Business", "Tech", "Science", "Sport",
        ],
        feed_urls: &[
            "https://www.theguardian.com/international/rss",
            "https://www.theguardian.com/world/rss",
            "https://www.theguardian.com/uk-news/rss",
            "https://www.theguardian.com/us-news/rss",
            "https://www.theguardian.com/business/rss",
            "https://www.theguardian.com/technology/rss",
            "https://www.theguardian.com/science/rss",
            "https://www.theguardian.com/sport/rss",
        ],
    },
];

impl NewsProvider {
    pub fn lookup(key: &str) -> Option<&'static NewsProvider> {
        let key = key.trim().to_lowercase();
        PROVIDERS.iter().find(|p| p.keys.contains(&key.as_str()))
    }

    pub fn feed_url(&self, feed: &str) -> Option<&'static str> {
        self.feed_names
            .iter()
            .position(|name| *name == feed)
            .and_then(|i| self.feed_urls.get(i).copied())
    }
}

/// Move `feed_url`'s path and query onto `base`.
fn rebase(feed_url: &str, base: &str) -> String {
    match Url::parse(feed_url) {
        Ok(url) => format!("{}{}", base.trim_end_matches('/'), &url[Position::BeforePath..]),
        Err(_) => feed_url.to_string(),
    }
}

pub struct NewsSource {
    provider: &'static NewsProvider,
    reader: FeedReader,
    cache: StoryCache,
    base_url: Option<String>,
}

impl NewsSource {
    pub fn new(provider: &'static NewsProvider, timeout: Duration) -> Result<Self> {
        Ok(Self {
            provider,
            reader: FeedReader::new(timeout)?,
            cache: StoryCache::new(),
            base_url: None,
        })
    }

    /// Serve every feed of the provider from `base_url`, keeping paths.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.to_string());
        self
    }

    fn resolve(&self, feed: &str) -> Result<String> {
        let url = self
            .provider
            .feed_url(feed)
            .ok_or_else(|| FeedmeError::UnknownFeed(feed.to_string()))?;
        Ok(match &self.base_url {
            Some(base) => rebase(url, base),
            None => url.to_string(),
        })
    }
}

#[async_trait]
impl Source for NewsSource {
    fn name(&self) -> String {
        self.provider.name.to_string()
    }

    fn feed_names(&self) -> &'static [&'static str] {
        self.provider.feed_names
    }

    fn feed_labels(&self) -> &'static [&'static str] {
        self.provider.feed_labels
    }

    #[instrument(skip(self), fields(provider = self.provider.name))]
    async fn fetch_story_ids(&self, feed: &str) -> Result<Vec<ItemId>> {
        check_feed(self.provider.feed_names, feed)?;
        let parsed = self.reader.read(&self.resolve(feed)?).await?;

        if parsed.items.is_empty() {
            return Err(FeedmeError::NoContent(feed.to_string()));
        }
        tracing::info!(count = parsed.items.len(), "Fetched headlines");
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
            self.provider.site_url.to_string()
        } else {
            item.url.clone()
        }
    }
}
