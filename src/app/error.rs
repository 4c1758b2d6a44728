use thiserror::Error;

use crate::domain::{Item, ItemId};

#[derive(Error, Debug)]
pub enum FeedmeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Item {0} not found")]
    ItemNotFound(ItemId),

    /// Some lookups in a batch failed. `items` still holds every slot that
    /// resolved, in input order.
    #[error("{} of {} items failed to load: {first}", .items.iter().filter(|i| i.is_none()).count(), .items.len())]
    PartialBatch {
        items: Vec<Option<Item>>,
        first: Box<FeedmeError>,
    },

    #[error("Unknown feed: {0}")]
    UnknownFeed(String),

    #[error("No stories found for feed {0:?}")]
    NoContent(String),

    #[error("No discussion thread available for item {0}")]
    MissingThread(ItemId),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

impl FeedmeError {
    /// True for lookups against an id the current snapshot does not hold.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FeedmeError::ItemNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, FeedmeError>;
