//! Integration tests for ingesting, reading back and exporting a mirrored feed.
//!
//! Each test builds its own archive. The fixture feed holds ten items with
//! guids `id-0` through `id-9`.

use std::sync::Arc;

use async_trait::async_trait;
use feedmirror::app::{MirrorError, Result};
use feedmirror::config::MirrorConfig;
use feedmirror::domain::{FeedMeta, ItemRecord};
use feedmirror::fetcher::{FetchResult, Fetcher};
use feedmirror::mirror::FeedMirror;
use feedmirror::store::{Archive, DirArchive, MemoryArchive};

/// Fails every request; used where scraping is disabled.
struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(
        &self,
        url: &str,
        _etag: Option<&str>,
        _last_modified: Option<&str>,
    ) -> Result<FetchResult> {
        Err(MirrorError::NotFound(url.to_string()))
    }
}

fn fixture_rss(count: usize) -> Vec<u8> {
    let mut doc = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>test feed</title>
    <link>http://example.com</link>
    <description>http://example.com</description>
"#,
    );
    for i in 0..count {
        doc.push_str(&format!(
            r#"    <item>
      <title>entry{i}</title>
      <description>desc{i}</description>
      <link>example.com</link>
      <guid>id-{i}</guid>
      <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
    </item>
"#
        ));
    }
    doc.push_str("  </channel>\n</rss>\n");
    doc.into_bytes()
}

fn fixture_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("id-{}", i)).collect()
}

fn create_mirror() -> FeedMirror<MemoryArchive> {
    FeedMirror::new(
        MemoryArchive::new(),
        Arc::new(OfflineFetcher),
        MirrorConfig::default(),
    )
}

async fn create_mirror_with_fixture() -> FeedMirror<MemoryArchive> {
    let mirror = create_mirror();
    mirror.update(&fixture_rss(10)).await.unwrap();
    mirror
}

fn normalize_link(link: &str) -> &str {
    link.trim_end_matches('/')
}

// ============================================================================
// Archive identity
// ============================================================================

#[tokio::test]
async fn test_ready_exposes_keys() {
    let mirror = create_mirror();
    assert!(!mirror.key().is_empty());
    assert!(!mirror.discovery_key().is_empty());
}

// ============================================================================
// Update
// ============================================================================

#[tokio::test]
async fn test_update_writes_metadata_then_items() {
    let mirror = create_mirror_with_fixture().await;

    let names: Vec<_> = mirror
        .archive()
        .readdir("/")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();

    let mut expected = vec!["metadata.json".to_string()];
    expected.extend(fixture_ids(10));
    assert_eq!(names, expected);
}

#[tokio::test]
async fn test_list_excludes_metadata() {
    let mirror = create_mirror_with_fixture().await;
    assert_eq!(mirror.list().await.unwrap(), fixture_ids(10));
}

#[tokio::test]
async fn test_update_same_items_is_idempotent() {
    let mirror = create_mirror_with_fixture().await;

    let report = mirror.update(&fixture_rss(10)).await.unwrap();
    assert!(report.added.is_empty());
    assert_eq!(mirror.list().await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_update_with_new_item() {
    let mirror = create_mirror_with_fixture().await;

    let report = mirror.update(&fixture_rss(11)).await.unwrap();
    assert_eq!(report.added, vec!["id-10"]);
    assert_eq!(mirror.list().await.unwrap(), fixture_ids(11));
}

#[tokio::test]
async fn test_update_empty_feed_succeeds() {
    let mirror = create_mirror();
    let report = mirror.update(&fixture_rss(0)).await.unwrap();
    assert!(report.added.is_empty());
    assert!(mirror.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_stores_item_fields() {
    let mirror = create_mirror_with_fixture().await;

    let item = mirror.get_item("id-3").await.unwrap();
    assert_eq!(item.title.as_deref(), Some("entry3"));
    assert_eq!(item.description.as_deref(), Some("desc3"));
    assert_eq!(item.link.as_deref(), Some("example.com"));
    assert_eq!(item.guid.as_deref(), Some("id-3"));
    assert!(item.date.is_some());
}

#[tokio::test]
async fn test_update_malformed_feed_writes_nothing() {
    let mirror = create_mirror();
    let err = mirror
        .update(b"<html><body>not a feed</body></html>")
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::FeedParse(_)));
    assert_eq!(mirror.archive().version().await.unwrap(), 0);
}

// ============================================================================
// Save / get
// ============================================================================

#[tokio::test]
async fn test_save_uses_default_name() {
    let mirror = create_mirror();
    mirror.save(&ItemRecord::with_title("moo"), None).await.unwrap();

    let entries = mirror.list().await.unwrap();
    assert_eq!(entries.len(), 1);

    let item = mirror.get(&entries[0]).await.unwrap();
    assert!(!item.is_empty());
}

#[tokio::test]
async fn test_get_not_found() {
    let mirror = create_mirror();
    let err = mirror.get("non-exists").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_save_with_pre_scrapped_data() {
    let mirror = create_mirror();
    mirror
        .save(&ItemRecord::with_title("foo"), Some(b"abc".as_slice()))
        .await
        .unwrap();

    let files = mirror.list().await.unwrap();
    assert_eq!(files.len(), 1);

    let raw = mirror.get(&files[0]).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    assert_eq!(value["title"], "foo");

    let data = mirror.get(&format!("scrapped/{}", files[0])).await.unwrap();
    assert_eq!(data, b"abc");

    // Pre-scrapped bodies do not land in the auto-scrape location
    assert!(mirror.get_scrapped(&files[0]).await.unwrap_err().is_not_found());
}

// ============================================================================
// Export / set_meta
// ============================================================================

#[tokio::test]
async fn test_export() {
    let mirror = create_mirror_with_fixture().await;
    let xml = mirror.export(10).await.unwrap();

    let feed = feed_rs::parser::parse(&xml[..]).unwrap();
    assert_eq!(feed.title.unwrap().content, "test feed");
    assert_eq!(normalize_link(&feed.links[0].href), "http://example.com");

    let mut titles: Vec<_> = feed
        .entries
        .iter()
        .map(|e| e.title.as_ref().unwrap().content.clone())
        .collect();
    titles.sort();
    let expected: Vec<_> = (0..10).map(|i| format!("entry{}", i)).collect();
    assert_eq!(titles, expected);
}

#[tokio::test]
async fn test_export_truncates_to_limit() {
    let mirror = create_mirror_with_fixture().await;
    let xml = mirror.export(4).await.unwrap();

    let feed = feed_rs::parser::parse(&xml[..]).unwrap();
    let ids: Vec<_> = feed.entries.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, fixture_ids(4));
}

#[tokio::test]
async fn test_set_meta() {
    let mirror = create_mirror();
    mirror
        .set_meta(&FeedMeta::new(
            "foo",
            "http://example2.com",
            "http://example2.com",
        ))
        .await
        .unwrap();

    let xml = mirror.export(10).await.unwrap();
    let feed = feed_rs::parser::parse(&xml[..]).unwrap();

    assert_eq!(feed.title.unwrap().content, "foo");
    assert_eq!(normalize_link(&feed.links[0].href), "http://example2.com");
    assert_eq!(feed.description.unwrap().content, "http://example2.com");
    assert!(feed.entries.is_empty());
}

// ============================================================================
// Durable archive
// ============================================================================

#[tokio::test]
async fn test_dir_archive_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let archive = DirArchive::open(dir.path()).await.unwrap();
        let mirror = FeedMirror::new(archive, Arc::new(OfflineFetcher), MirrorConfig::default());
        mirror.update(&fixture_rss(10)).await.unwrap();
    }

    let archive = DirArchive::open(dir.path()).await.unwrap();
    let mirror = FeedMirror::new(archive, Arc::new(OfflineFetcher), MirrorConfig::default());
    assert_eq!(mirror.list().await.unwrap(), fixture_ids(10));

    let report = mirror.update(&fixture_rss(11)).await.unwrap();
    assert_eq!(report.added, vec!["id-10"]);
    assert_eq!(mirror.get_item("id-10").await.unwrap().title.as_deref(), Some("entry10"));
}
