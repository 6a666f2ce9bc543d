//! Record layout inside the archive.
//!
//! ```text
//! metadata.json     feed-level FeedMeta
//! <id>              ItemRecord as JSON
//! scrap/<id>        body fetched from the item link during update
//! scrapped/<id>     body supplied by the caller through save
//! ```

use crate::store::DirEntry;

pub const META_FILE: &str = "metadata.json";
pub const SCRAP_DIR: &str = "scrap";
pub const SCRAPPED_DIR: &str = "scrapped";

/// Names that can never be used as an item identifier.
pub fn is_reserved(name: &str) -> bool {
    matches!(name, META_FILE | SCRAP_DIR | SCRAPPED_DIR | "." | "..")
}

pub fn scrap_path(id: &str) -> String {
    format!("{}/{}", SCRAP_DIR, id)
}

pub fn scrapped_path(id: &str) -> String {
    format!("{}/{}", SCRAPPED_DIR, id)
}

/// Whether a root directory entry is an item record.
pub fn is_item_entry(entry: &DirEntry) -> bool {
    !entry.is_dir && entry.name != META_FILE
}

/// Map an identifier passed to `get` onto the archive path it refers to.
///
/// `scrap/<id>` and `scrapped/<id>` address payloads directly; anything else
/// must be a bare item identifier. Returns `None` when the identifier cannot
/// name a record.
pub fn resolve(identifier: &str) -> Option<String> {
    let identifier = identifier.trim_start_matches('/');
    if let Some((dir, id)) = identifier.split_once('/') {
        let known = dir == SCRAP_DIR || dir == SCRAPPED_DIR;
        let plain = !matches!(id, "" | "." | "..") && !id.contains('/');
        return (known && plain).then(|| identifier.to_string());
    }
    if identifier.is_empty() || is_reserved(identifier) {
        return None;
    }
    Some(identifier.to_string())
}
