//! Source fetchers for desktop
//!
//! `DesktopFetcher` routes `http(s)://` keys to `HttpFetcher` and everything
//! path-like to `FileFetcher`.

pub mod file;
pub mod http;

pub use file::FileFetcher;
pub use http::HttpFetcher;

use async_trait::async_trait;
use segue_core::{Result, SegueError, SourceFetcher};
use url::Url;

/// Where a source key points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Http,
    File,
}

impl SourceKind {
    /// Classify `source_key` by scheme
    ///
    /// Keys that do not parse as URLs, and single-letter schemes (Windows
    /// drive letters), are file paths.
    pub fn of(source_key: &str) -> Result<Self> {
        let Ok(url) = Url::parse(source_key) else {
            return Ok(Self::File);
        };

        match url.scheme() {
            "http" | "https" => Ok(Self::Http),
            "file" => Ok(Self::File),
            scheme if scheme.len() == 1 => Ok(Self::File),
            scheme => Err(SegueError::fetch(format!(
                "unsupported scheme '{}' in {}",
                scheme, source_key
            ))),
        }
    }
}

/// Fetcher for both remote and local sources
#[derive(Debug, Clone, Default)]
pub struct DesktopFetcher {
    http: HttpFetcher,
    file: FileFetcher,
}

impl DesktopFetcher {
    pub fn new(http: HttpFetcher, file: FileFetcher) -> Self {
        Self { http, file }
    }
}

#[async_trait]
impl SourceFetcher for DesktopFetcher {
    async fn fetch(&self, source_key: &str) -> Result<Vec<u8>> {
        match SourceKind::of(source_key)? {
            SourceKind::Http => self.http.fetch(source_key).await,
            SourceKind::File => self.file.fetch(source_key).await,
        }
    }
}
