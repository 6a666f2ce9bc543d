//! The feed mirror: ingest feed documents into an archive and read them back.
//!
//! ```text
//! feed bytes → Normalizer → diff against list() → [scrape] → Archive
//! Archive → list/get/save/set_meta/export
//! ```

mod ingest;
pub mod layout;

pub use ingest::UpdateReport;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::app::{MirrorError, Result};
use crate::config::{InvalidRecordPolicy, MirrorConfig};
use crate::domain::{FeedMeta, ItemId, ItemRecord};
use crate::exporter;
use crate::fetcher::Fetcher;
use crate::normalizer::Normalizer;
use crate::store::Archive;

pub struct FeedMirror<A: Archive> {
    archive: A,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    normalizer: Normalizer,
    config: MirrorConfig,
}

impl<A: Archive> FeedMirror<A> {
    pub fn new(archive: A, fetcher: Arc<dyn Fetcher + Send + Sync>, config: MirrorConfig) -> Self {
        Self {
            archive,
            fetcher,
            normalizer: Normalizer::new(),
            config,
        }
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    pub fn key(&self) -> &str {
        self.archive.key()
    }

    pub fn discovery_key(&self) -> &str {
        self.archive.discovery_key()
    }

    /// Identifiers of all stored items, in the order they were first stored.
    pub async fn list(&self) -> Result<Vec<String>> {
        let entries = self.archive.readdir("/").await?;
        Ok(entries
            .into_iter()
            .filter(layout::is_item_entry)
            .map(|e| e.name)
            .collect())
    }

    /// Raw bytes of an item record, or of a payload when `identifier` is
    /// prefixed with `scrap/` or `scrapped/`.
    pub async fn get(&self, identifier: &str) -> Result<Vec<u8>> {
        let path = layout::resolve(identifier)
            .ok_or_else(|| MirrorError::NotFound(identifier.to_string()))?;
        self.archive.read(&path).await
    }

    pub async fn get_item(&self, id: &str) -> Result<ItemRecord> {
        let raw = self.get(id).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Body fetched from the item's link during update.
    pub async fn get_scrapped(&self, id: &str) -> Result<Vec<u8>> {
        self.get(&layout::scrap_path(id)).await
    }

    /// Store an item directly, bypassing feed parsing.
    ///
    /// A `scrapped` body is written to `scrapped/<id>`. An item whose guid is
    /// already stored is rejected; items without a usable guid always get a
    /// fresh identifier.
    pub async fn save(&self, item: &ItemRecord, scrapped: Option<&[u8]>) -> Result<ItemId> {
        let id = match item.guid.as_deref().and_then(ItemId::from_guid) {
            Some(id) => {
                if self.archive.exists(id.as_str()).await? {
                    return Err(MirrorError::ItemExists(id.into_string()));
                }
                id
            }
            None => self.unused_content_id(item).await?,
        };

        if let Some(body) = scrapped {
            self.archive
                .write(&layout::scrapped_path(id.as_str()), body)
                .await?;
        }
        self.write_record(&id, item).await?;

        debug!("Saved item {} ({})", id, item.display_title());
        Ok(id)
    }

    /// Stored feed metadata, or the configured defaults if none was written.
    pub async fn meta(&self) -> Result<FeedMeta> {
        match self.archive.read(layout::META_FILE).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.is_not_found() => Ok(self.config.defaults.clone()),
            Err(e) => Err(e),
        }
    }

    /// Replace `metadata.json` wholesale.
    pub async fn set_meta(&self, meta: &FeedMeta) -> Result<()> {
        let raw = serde_json::to_vec(meta)?;
        self.archive.write(layout::META_FILE, &raw).await
    }

    /// Render feed metadata and the first `limit` stored items as RSS 2.0.
    pub async fn export(&self, limit: usize) -> Result<Vec<u8>> {
        let meta = self.meta().await?;
        let ids = self.list().await?;

        let mut items = Vec::with_capacity(limit.min(ids.len()));
        for id in ids.into_iter().take(limit) {
            let raw = self.archive.read(&id).await?;
            match serde_json::from_slice::<ItemRecord>(&raw) {
                Ok(item) => items.push((id, item)),
                Err(e) => match self.config.on_invalid_record {
                    InvalidRecordPolicy::Skip => {
                        warn!("Skipping unreadable record {}: {}", id, e);
                    }
                    InvalidRecordPolicy::Fail => return Err(e.into()),
                },
            }
        }

        exporter::render_rss(&meta, &items)
    }

    async fn write_record(&self, id: &ItemId, item: &ItemRecord) -> Result<()> {
        let raw = serde_json::to_vec(item)?;
        self.archive.write(id.as_str(), &raw).await
    }

    async fn unused_content_id(&self, item: &ItemRecord) -> Result<ItemId> {
        let mut salt = 0;
        loop {
            let id = ItemId::content_hash(item, salt);
            if !self.archive.exists(id.as_str()).await? {
                return Ok(id);
            }
            salt += 1;
        }
    }
}
