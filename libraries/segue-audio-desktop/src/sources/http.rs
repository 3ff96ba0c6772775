//! HTTP(S) source fetching

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use segue_core::{Result, SegueError, SourceFetcher};
use tracing::debug;

/// Fetches source bytes over HTTP
///
/// Every request bypasses intermediate caches; the buffer cache is the only
/// cache the player trusts.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, user agent)
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    async fn fetch(&self, source_key: &str) -> Result<Vec<u8>> {
        debug!(url = %source_key, "Fetching source");

        let response = self
            .http
            .get(source_key)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| SegueError::fetch(format!("{}: {}", source_key, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SegueError::fetch(format!(
                "HTTP {} for {}",
                status.as_u16(),
                source_key
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SegueError::fetch(format!("{}: {}", source_key, e)))?;

        debug!(url = %source_key, bytes = bytes.len(), "Source fetched");
        Ok(bytes.to_vec())
    }
}
