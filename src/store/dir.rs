use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use rusqlite_migration::{Migrations, M};
use tracing::debug;

use crate::app::{MirrorError, Result};
use crate::store::{
    ancestors, children_of, derive_discovery_key, generate_key, normalize_path, Archive, DirEntry,
    KEY_LEN,
};

const DB_FILE: &str = "archive.db";

/// Archive persisted as a SQLite database inside a local directory.
///
/// Every write inserts a row into `entries`; rows are never updated or
/// deleted (triggers abort such statements). The current content of a path is
/// its row with the highest `seq`, and enumeration order is the smallest
/// `seq` per path.
pub struct DirArchive {
    root: PathBuf,
    key: String,
    discovery_key: String,
    conn: Mutex<Connection>,
}

impl DirArchive {
    /// Open the archive at `root`, creating the directory and database if needed.
    pub async fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;

        let mut conn = Connection::open(root.join(DB_FILE))?;
        Self::run_migrations(&mut conn)?;
        let key = Self::load_or_create_key(&mut conn)?;
        debug!(
            "Opened archive at {} ({} writes)",
            root.display(),
            count_entries(&conn)?
        );

        Ok(Self {
            root,
            discovery_key: derive_discovery_key(&key),
            key: hex::encode(&key),
            conn: Mutex::new(conn),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_migrations(conn: &mut Connection) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        migrations
            .to_latest(conn)
            .map_err(|e| MirrorError::Config(format!("Archive schema migration failed: {}", e)))
    }

    /// The key row is created in the same transaction that checks for it, so
    /// an interrupted first open leaves either no key or a complete one.
    fn load_or_create_key(conn: &mut Connection) -> Result<Vec<u8>> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let stored: Option<Vec<u8>> = tx
            .query_row("SELECT key FROM archive WHERE id = 1", [], |row| row.get(0))
            .optional()?;

        let key = match stored {
            Some(key) if key.len() == KEY_LEN => key,
            Some(key) => {
                return Err(MirrorError::Config(format!(
                    "Archive key is {} bytes, expected {}",
                    key.len(),
                    KEY_LEN
                )));
            }
            None => {
                let key = generate_key().to_vec();
                tx.execute(
                    "INSERT INTO archive (id, key, created_at) VALUES (1, ?1, ?2)",
                    params![key, Utc::now().to_rfc3339()],
                )?;
                key
            }
        };

        tx.commit()?;
        Ok(key)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            MirrorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }
}

fn count_entries(conn: &Connection) -> Result<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn file_exists(conn: &Connection, path: &str) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE path = ?1)",
        params![path],
        |row| row.get(0),
    )?)
}

/// `substr` counts characters, not bytes, for TEXT values.
fn dir_prefix(dir: &str) -> (String, i64) {
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    };
    let len = prefix.chars().count() as i64;
    (prefix, len)
}

fn has_descendants(conn: &Connection, dir: &str) -> Result<bool> {
    let (prefix, len) = dir_prefix(dir);
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM entries WHERE substr(path, 1, ?1) = ?2)",
        params![len, prefix],
        |row| row.get(0),
    )?)
}

/// Distinct paths below `dir`, ordered by their first write.
fn paths_under(conn: &Connection, dir: &str) -> Result<Vec<String>> {
    let (prefix, len) = dir_prefix(dir);
    let mut stmt = conn.prepare(
        "SELECT path FROM entries
         WHERE substr(path, 1, ?1) = ?2
         GROUP BY path
         ORDER BY MIN(seq)",
    )?;

    let paths = stmt
        .query_map(params![len, prefix], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(paths)
}

#[async_trait]
impl Archive for DirArchive {
    fn key(&self) -> &str {
        &self.key
    }

    fn discovery_key(&self) -> &str {
        &self.discovery_key
    }

    async fn version(&self) -> Result<u64> {
        count_entries(&*self.conn()?)
    }

    async fn readdir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let dir = normalize_path(path)?;
        let paths = paths_under(&*self.conn()?, &dir)?;
        if !dir.is_empty() && paths.is_empty() {
            return Err(MirrorError::NotFound(path.to_string()));
        }
        Ok(children_of(paths.iter().map(String::as_str), &dir))
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let file = normalize_path(path)?;
        self.conn()?
            .query_row(
                "SELECT data FROM entries WHERE path = ?1 ORDER BY seq DESC LIMIT 1",
                params![file],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| MirrorError::NotFound(path.to_string()))
    }

    async fn write(&self, path: &str, data: &[u8]) -> Result<()> {
        let file = normalize_path(path)?;
        if file.is_empty() {
            return Err(MirrorError::InvalidPath(path.to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut conflict = has_descendants(&tx, &file)?;
        for dir in ancestors(&file) {
            conflict = conflict || file_exists(&tx, dir)?;
        }
        if conflict {
            return Err(MirrorError::InvalidPath(path.to_string()));
        }

        tx.execute(
            "INSERT INTO entries (path, data, written_at) VALUES (?1, ?2, ?3)",
            params![file, data, Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        let conn = self.conn()?;
        Ok(path.is_empty() || file_exists(&conn, &path)? || has_descendants(&conn, &path)?)
    }
}
