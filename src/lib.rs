//! # feedmirror
//!
//! Mirrors an RSS/Atom feed into an append-only archive.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → Normalizer → FeedMirror (diff, scrape) → Archive
//!                                 ↓
//!                          Exporter (RSS 2.0)
//! ```
//!
//! Every item is stored once, as a JSON record named after its guid. When
//! scraping is enabled the page behind the item's link is stored next to it.
//!
//! ## Quick Start
//!
//! ```bash
//! # Ingest a feed, fetching every new item's page
//! feedmirror update https://blog.rust-lang.org/feed.xml --scrap
//!
//! # List stored items
//! feedmirror list
//!
//! # Write the archive back out as RSS
//! feedmirror export --limit 20 --output mirror.xml
//! ```

/// Application context and error types.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration loaded from `~/.config/feedmirror/config.toml`.
pub mod config;

/// Periodic re-ingest of a feed source (`feedmirror watch`).
pub mod daemon;

/// Core domain models.
///
/// - [`FeedMeta`](domain::FeedMeta): feed-level title, description, link
/// - [`ItemRecord`](domain::ItemRecord): stored item metadata
/// - [`ItemId`](domain::ItemId): record name derived from the guid
pub mod domain;

/// RSS 2.0 document generation.
pub mod exporter;

/// HTTP fetching with conditional request support.
pub mod fetcher;

/// The archive façade: update, list, get, save, set_meta, export.
pub mod mirror;

/// Feed parsing with feed-rs.
///
/// Converts RSS 0.9x/1.0/2.0, Atom 0.3/1.0, and JSON Feed 1.0 into
/// [`ItemRecord`](domain::ItemRecord) values.
pub mod normalizer;

/// Append-only archives: [`DirArchive`](store::DirArchive) in SQLite and
/// [`MemoryArchive`](store::MemoryArchive) in memory.
pub mod store;
