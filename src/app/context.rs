use std::sync::Arc;

use crate::app::error::{FeedmeError, Result};
use crate::config::Config;
use crate::source::{self, Source};

/// Everything a command or the TUI needs: the loaded config, the opened
/// source and the feed to start on.
pub struct AppContext {
    pub config: Config,
    pub source: Arc<dyn Source>,
    pub feed: String,
}

impl AppContext {
    /// Open `source_spec`, or the configured default source, on `feed`, or
    /// that source's first feed.
    pub fn new(config: Config, source_spec: Option<&str>, feed: Option<&str>) -> Result<Self> {
        let spec = source_spec
            .map(str::to_string)
            .unwrap_or_else(|| config.general.default_source.clone());
        let source = source::open(&spec, &config.network)?;
        Self::with_source(config, source, feed)
    }

    pub fn with_source(
        config: Config,
        source: Arc<dyn Source>,
        feed: Option<&str>,
    ) -> Result<Self> {
        let feed = match feed {
            Some(feed) if source.feed_names().contains(&feed) => feed.to_string(),
            Some(feed) => return Err(FeedmeError::UnknownFeed(feed.to_string())),
            None => source.default_feed().to_string(),
        };

        Ok(Self {
            config,
            source,
            feed,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.config.general.batch_size.max(1)
    }

    pub fn comment_depth(&self) -> usize {
        self.config.general.comment_depth
    }
}
