use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response, StatusCode};

use crate::app::{FeedmeError, Result};
use crate::fetcher::{Fetcher, Throttle};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

pub struct HttpFetcher {
    client: Client,
    throttle: Option<Throttle>,
    retry_backoff: Duration,
    accept: Option<&'static str>,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        Self::with_timeout(user_agent, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            throttle: None,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            accept: None,
        })
    }

    /// Space requests at least `min_delay` apart and retry once on HTTP 429.
    pub fn throttled(mut self, min_delay: Duration) -> Self {
        self.throttle = Some(Throttle::new(min_delay));
        self
    }

    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn accept(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }

    async fn send(&self, url: &str) -> Result<Response> {
        if let Some(throttle) = &self.throttle {
            throttle.wait().await;
        }
        tracing::debug!(url, "GET");

        let mut request = self.client.get(url);
        if let Some(accept) = self.accept {
            request = request.header(ACCEPT, accept);
        }
        Ok(request.send().await?)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut response = self.send(url).await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS && self.throttle.is_some() {
            tracing::warn!(
                url,
                backoff_ms = self.retry_backoff.as_millis() as u64,
                "Rate limited, retrying once"
            );
            tokio::time::sleep(self.retry_backoff).await;
            response = self.send(url).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FeedmeError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
