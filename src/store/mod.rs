//! Append-only archive abstraction.
//!
//! An archive is a path-keyed byte store. Writes are never destructive: a
//! rewrite of a path appends a new version and the path keeps its position
//! in enumeration order, which is the order in which paths were first
//! written.

pub mod dir;
pub mod memory;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};

use crate::app::{MirrorError, Result};

pub use dir::DirArchive;
pub use memory::MemoryArchive;

/// One child of an archive directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

#[async_trait]
pub trait Archive: Send + Sync {
    /// Hex-encoded public key of the archive.
    fn key(&self) -> &str;

    /// Hex-encoded key derived from [`Archive::key`] for discovery purposes.
    fn discovery_key(&self) -> &str;

    /// Number of writes applied to the archive so far.
    async fn version(&self) -> Result<u64>;

    /// List the children of `path` in first-write order.
    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>>;

    /// Read the latest version of the file at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Append a new version of the file at `path`.
    async fn write(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Whether `path` names a file or a directory.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Normalize an archive path: strips surrounding slashes and rejects empty,
/// `.` and `..` segments. The root is the empty string.
pub fn normalize_path(path: &str) -> Result<String> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }

    for segment in trimmed.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(MirrorError::InvalidPath(path.to_string()));
        }
    }

    Ok(trimmed.to_string())
}

/// Ordered path index shared by the archive implementations. `V` is whatever
/// the implementation keeps for the latest version of a file.
#[derive(Debug)]
pub(crate) struct PathIndex<V> {
    order: Vec<String>,
    heads: HashMap<String, V>,
    version: u64,
}

impl<V> Default for PathIndex<V> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            heads: HashMap::new(),
            version: 0,
        }
    }
}

impl<V> PathIndex<V> {
    pub(crate) fn insert(&mut self, path: String, value: V) {
        if !self.heads.contains_key(&path) {
            self.order.push(path.clone());
        }
        self.heads.insert(path, value);
        self.version += 1;
    }

    pub(crate) fn get(&self, path: &str) -> Option<&V> {
        self.heads.get(path)
    }

    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    /// A path conflicts when it would turn an existing file into a directory
    /// or an existing directory into a file.
    pub(crate) fn conflicts(&self, path: &str) -> bool {
        let as_dir = format!("{}/", path);
        self.order.iter().any(|p| p.starts_with(&as_dir))
            || ancestors(path).any(|dir| self.heads.contains_key(dir))
    }

    pub(crate) fn children(&self, dir: &str) -> Vec<DirEntry> {
        children_of(self.order.iter().map(String::as_str), dir)
    }

    pub(crate) fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || !self.children(path).is_empty()
    }
}

/// Proper ancestors of a normalized path, nearest first: `a/b/c` yields
/// `a/b` then `a`.
pub(crate) fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(path.rsplit_once('/').map(|(head, _)| head), |&dir| {
        dir.rsplit_once('/').map(|(head, _)| head)
    })
}

/// Direct children of `dir` among `paths`, which must be normalized and in
/// first-write order. A child is a directory when some path continues below it.
pub(crate) fn children_of<'a>(paths: impl IntoIterator<Item = &'a str>, dir: &str) -> Vec<DirEntry> {
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    };

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for path in paths {
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        let (name, is_dir) = match rest.split_once('/') {
            Some((head, _)) => (head, true),
            None => (rest, false),
        };
        if seen.insert(name.to_string()) {
            entries.push(DirEntry {
                name: name.to_string(),
                is_dir,
            });
        }
    }
    entries
}

/// Length of an archive key in bytes.
pub(crate) const KEY_LEN: usize = 32;

/// Generate a fresh 32-byte archive key.
pub(crate) fn generate_key() -> [u8; KEY_LEN] {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let mut hasher = Sha256::new();
    hasher.update(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&hasher.finalize());
    key
}

pub(crate) fn derive_discovery_key(key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"hypercore");
    hasher.update(key);
    hex::encode(hasher.finalize())
}
