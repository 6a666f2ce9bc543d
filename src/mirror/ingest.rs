use std::collections::HashSet;

use tracing::{debug, info};
use url::Url;

use crate::app::{MirrorError, Result};
use crate::domain::{FeedMeta, FeedUpdate, ItemId, ItemRecord};
use crate::fetcher::Fetcher;
use crate::mirror::{layout, FeedMirror};
use crate::store::Archive;

/// Outcome of a successful [`FeedMirror::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Identifiers stored by this update, in document order
    pub added: Vec<String>,
    /// Items that were already stored (or repeated within the document)
    pub skipped: usize,
    /// Number of `scrap/<id>` bodies written
    pub scraped: usize,
    /// Whether `metadata.json` was (re)written
    pub meta_updated: bool,
}

impl<A: Archive> FeedMirror<A> {
    /// Ingest a feed document, storing every item not yet in the archive.
    ///
    /// Items are processed one at a time in document order. The first fetch
    /// or write failure aborts the update; records written before it stay in
    /// the archive, so re-running the update resumes where it stopped.
    pub async fn update(&self, document: &[u8]) -> Result<UpdateReport> {
        let parsed = self.normalizer.normalize(document)?;

        let mut report = UpdateReport {
            meta_updated: self.merge_meta(&parsed.meta).await?,
            ..Default::default()
        };

        let mut known: HashSet<String> = self.list().await?.into_iter().collect();

        for item in parsed.items {
            let id = ItemId::derive(&item);
            if !known.insert(id.to_string()) {
                debug!("Item {} already stored", id);
                report.skipped += 1;
                continue;
            }

            let body = if self.config.scrap {
                self.scrape(&id, &item).await?
            } else {
                None
            };

            // The record goes last: once it exists the item counts as stored
            if let Some(body) = body {
                self.archive
                    .write(&layout::scrap_path(id.as_str()), &body)
                    .await?;
                report.scraped += 1;
            }
            self.write_record(&id, &item).await?;

            info!("Stored item {} ({})", id, item.display_title());
            report.added.push(id.into_string());
        }

        info!(
            "Update complete: {} new items, {} already stored",
            report.added.len(),
            report.skipped
        );
        Ok(report)
    }

    /// Write `metadata.json` when the document's feed fields change it.
    async fn merge_meta(&self, update: &FeedUpdate) -> Result<bool> {
        let stored: Option<FeedMeta> = match self.archive.read(layout::META_FILE).await {
            Ok(raw) => Some(serde_json::from_slice(&raw)?),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };

        let current = stored.clone().unwrap_or_else(|| self.config.defaults.clone());
        let merged = current.apply(update);
        if stored.as_ref() == Some(&merged) {
            return Ok(false);
        }

        self.set_meta(&merged).await?;
        Ok(true)
    }

    async fn scrape(&self, id: &ItemId, item: &ItemRecord) -> Result<Option<Vec<u8>>> {
        let Some(link) = item.link.as_deref() else {
            debug!("Item {} has no link, nothing to scrape", id);
            return Ok(None);
        };

        let url = Url::parse(link)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MirrorError::InvalidUrl(link.to_string()));
        }

        let body = self.fetcher.fetch(url.as_str(), None, None).await?.into_body();
        if let Some(ref body) = body {
            debug!("Scraped {} bytes for {} from {}", body.len(), id, url);
        }
        Ok(body)
    }
}
