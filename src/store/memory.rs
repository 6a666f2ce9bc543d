use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::app::{MirrorError, Result};
use crate::store::{derive_discovery_key, generate_key, normalize_path, Archive, DirEntry, PathIndex};

/// Volatile archive kept entirely in memory.
pub struct MemoryArchive {
    key: String,
    discovery_key: String,
    index: Mutex<PathIndex<Vec<u8>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        let key = generate_key();
        Self {
            key: hex::encode(key),
            discovery_key: derive_discovery_key(&key),
            index: Mutex::new(PathIndex::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PathIndex<Vec<u8>>>> {
        self.index
            .lock()
            .map_err(|e| MirrorError::Io(std::io::Error::other(e.to_string())))
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Archive for MemoryArchive {
    fn key(&self) -> &str {
        &self.key
    }

    fn discovery_key(&self) -> &str {
        &self.discovery_key
    }

    async fn version(&self) -> Result<u64> {
        Ok(self.lock()?.version())
    }

    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = normalize_path(path)?;
        let index = self.lock()?;
        if !index.is_dir(&dir) {
            return Err(MirrorError::NotFound(path.to_string()));
        }
        Ok(index.children(&dir))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = normalize_path(path)?;
        self.lock()?
            .get(&file)
            .cloned()
            .ok_or_else(|| MirrorError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let file = normalize_path(path)?;
        let mut index = self.lock()?;
        if file.is_empty() || index.conflicts(&file) {
            return Err(MirrorError::InvalidPath(path.to_string()));
        }
        index.insert(file, data.to_vec());
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        let index = self.lock()?;
        Ok(index.get(&path).is_some() || index.is_dir(&path))
    }
}
