//! Resource Fetchers
//!
//! The fetch capability the aggregator depends on, and its HTTP implementation.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::ResourceKind;
use crate::error::FetchResult;

/// Retrieves the raw JSON body of one analytics resource
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(&self, kind: ResourceKind) -> FetchResult<Value>;
}

/// Fetches resources with `GET {base_url}{kind.path()}`
pub struct HttpResourceFetcher {
    client: Client,
    base_url: String,
}

impl HttpResourceFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build analytics HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, kind: ResourceKind) -> String {
        format!("{}{}", self.base_url, kind.path())
    }
}

#[async_trait]
impl ResourceFetcher for HttpResourceFetcher {
    async fn fetch(&self, kind: ResourceKind) -> FetchResult<Value> {
        let url = self.url_for(kind);
        debug!(%kind, %url, "Fetching analytics resource");

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let fetcher = HttpResourceFetcher::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(fetcher.url_for(ResourceKind::Errors), "http://localhost:5000/error_detection");
        assert_eq!(fetcher.url_for(ResourceKind::Performance), "http://localhost:5000/model_performance");
    }
}
