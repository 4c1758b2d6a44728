pub mod http_fetcher;
pub mod parallel;
pub mod throttle;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;
pub use parallel::ParallelFetcher;
pub use throttle::Throttle;

/// Performs a GET and returns the body of a successful response.
///
/// Non-success statuses are errors. Implementations may throttle or retry.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
