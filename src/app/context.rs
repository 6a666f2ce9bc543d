use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app::error::{MirrorError, Result};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::{FetchResult, Fetcher};
use crate::mirror::FeedMirror;
use crate::store::DirArchive;

pub struct AppContext {
    pub mirror: FeedMirror<DirArchive>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub config: Config,
}

impl AppContext {
    pub async fn open(archive_path: Option<PathBuf>, config: Config) -> Result<Self> {
        let archive_path = match archive_path {
            Some(p) => p,
            None => Self::default_archive_path()?,
        };

        let archive = DirArchive::open(&archive_path).await?;
        let fetcher: Arc<dyn Fetcher + Send + Sync> =
            Arc::new(HttpFetcher::with_config(&config.fetcher)?);
        let mirror = FeedMirror::new(archive, fetcher.clone(), config.mirror.clone());

        Ok(Self {
            mirror,
            fetcher,
            config,
        })
    }

    pub fn archive_path(&self) -> &Path {
        self.mirror.archive().root()
    }

    /// Load a feed document from an http(s) URL or a local file.
    ///
    /// Validators are only sent for URLs; files always yield content.
    pub async fn fetch_source(
        &self,
        source: &str,
        etag: Option<&str>,
        last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        if source.starts_with("http://") || source.starts_with("https://") {
            return self.fetcher.fetch(source, etag, last_modified).await;
        }

        let body = tokio::fs::read(source).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MirrorError::NotFound(source.to_string())
            } else {
                MirrorError::Io(e)
            }
        })?;

        Ok(FetchResult::Content {
            body,
            etag: None,
            last_modified: None,
        })
    }

    fn default_archive_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| MirrorError::Config("Could not find data directory".into()))?;
        Ok(data_dir.join("feedmirror"))
    }
}
