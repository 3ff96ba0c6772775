//! Local file source fetching

use async_trait::async_trait;
use segue_core::{Result, SegueError, SourceFetcher};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Reads source bytes from disk
///
/// Keys are `file://` URLs or paths. Relative paths resolve against `root`
/// when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative keys against `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// Filesystem path for `source_key`
    pub fn resolve(&self, source_key: &str) -> Result<PathBuf> {
        let path = if source_key.starts_with("file:") {
            Url::parse(source_key)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| SegueError::fetch(format!("invalid file URL: {}", source_key)))?
        } else {
            PathBuf::from(source_key)
        };

        Ok(match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        })
    }

    async fn read(path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| SegueError::fetch(format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl SourceFetcher for FileFetcher {
    async fn fetch(&self, source_key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(source_key)?;
        debug!(path = %path.display(), "Reading source");
        Self::read(&path).await
    }
}
