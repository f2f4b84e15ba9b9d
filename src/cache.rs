//! File-backed response cache with TTL expiry and prefix invalidation.
//!
//! Each entry lives in its own JSON file named after the hex encoding of its
//! key, so every key prefix is also a filename prefix. Writes go through a
//! temp file in the same directory followed by an atomic rename; readers see
//! either the old entry or the new one. Every read-side failure is a miss.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

const ENTRY_EXTENSION: &str = "json";
const HASHED_PREFIX: &str = "h-";
/// Longest hex stem used verbatim; longer keys are stored under their SHA-256.
const MAX_HEX_STEM_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cache entry encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tempfile::PersistError> for CacheError {
    fn from(err: tempfile::PersistError) -> Self {
        CacheError::Io(err.error)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// TTL-expiring store of API responses bound to one directory.
#[derive(Debug)]
pub struct ResponseCache {
    dir: PathBuf,
    closed: AtomicBool,
}

impl ResponseCache {
    /// Binds a cache to `dir`. The directory is created on the first write.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the cached value for `key` while it is still fresh.
    ///
    /// Reads never delete; stale and unreadable files stay until
    /// [`ResponseCache::purge_expired`].
    pub fn get(&self, key: &str) -> Option<Value> {
        if self.is_closed() {
            return None;
        }
        let path = self.entry_path(key);
        let entry = match read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!("cache miss for {}", key);
                return None;
            }
            Err(err) => {
                debug!("unreadable cache entry {}: {}", path.display(), err);
                return None;
            }
        };
        if entry.key != key {
            debug!("cache key mismatch in {}", path.display());
            return None;
        }
        if entry.is_expired(Utc::now()) {
            debug!("cache entry for {} expired at {}", key, entry.expires_at);
            return None;
        }
        debug!("cache hit for {}", key);
        Some(entry.value)
    }

    /// Typed read; a value that does not decode as `T` is a miss.
    pub fn get_as<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                debug!("cached value for {} has unexpected shape: {}", key, err);
                None
            }
        }
    }

    /// Stores `value` for `ttl`. Failures are logged and otherwise ignored.
    pub fn put(&self, key: &str, value: &Value, ttl: Duration) {
        if let Err(err) = self.try_put(key, value, ttl) {
            warn!("failed to cache response for {}: {}", key, err);
        }
    }

    /// Stores `value` for `ttl`, reporting write failures. A closed cache
    /// accepts and drops the write.
    pub fn try_put(&self, key: &str, value: &Value, ttl: Duration) -> Result<(), CacheError> {
        if self.is_closed() {
            return Ok(());
        }
        let entry = CacheEntry {
            key: key.to_string(),
            value: value.clone(),
            expires_at: expiry_after(Utc::now(), ttl),
        };
        fs::create_dir_all(&self.dir)?;
        let mut file = NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut file, &entry)?;
        file.flush()?;
        file.persist(self.entry_path(key))?;
        debug!("cached {} until {}", key, entry.expires_at);
        Ok(())
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn invalidate(&self, prefix: &str) {
        if self.is_closed() {
            return;
        }
        let hex_prefix = hex::encode(prefix.as_bytes());
        let mut removed = 0usize;
        for path in self.entry_files() {
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let matches = if stem.starts_with(HASHED_PREFIX) {
                matches!(read_entry(&path), Ok(Some(entry)) if entry.key.starts_with(prefix))
            } else {
                stem.starts_with(&hex_prefix)
            };
            if matches && remove_quietly(&path) {
                removed += 1;
            }
        }
        debug!("invalidated {} cache entries under {:?}", removed, prefix);
    }

    /// Deletes expired and unreadable entries, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        if self.is_closed() {
            return 0;
        }
        let now = Utc::now();
        let mut removed = 0;
        for path in self.entry_files() {
            let stale = match read_entry(&path) {
                Ok(Some(entry)) => entry.is_expired(now),
                Ok(None) => false,
                Err(_) => true,
            };
            if stale && remove_quietly(&path) {
                removed += 1;
            }
        }
        removed
    }

    /// Releases the cache. Later reads miss and writes are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("closed response cache at {}", self.dir.display());
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(entry_file_name(key))
    }

    fn entry_files(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    debug!("cannot list cache directory {}: {}", self.dir.display(), err);
                }
                return Vec::new();
            }
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().and_then(|ext| ext.to_str()) == Some(ENTRY_EXTENSION)
            })
            .collect()
    }
}

impl Drop for ResponseCache {
    fn drop(&mut self) {
        self.close();
    }
}

/// Filesystem-safe, prefix-preserving file name for a cache key.
fn entry_file_name(key: &str) -> String {
    let stem = hex::encode(key.as_bytes());
    if stem.len() <= MAX_HEX_STEM_LEN {
        format!("{}.{}", stem, ENTRY_EXTENSION)
    } else {
        let digest = Sha256::digest(key.as_bytes());
        format!("{}{}.{}", HASHED_PREFIX, hex::encode(digest), ENTRY_EXTENSION)
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// `Ok(None)` when the file does not exist.
fn read_entry(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

fn remove_quietly(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                debug!("could not remove cache file {}: {}", path.display(), err);
            }
            false
        }
    }
}

/// Deterministic cache key: colon-joined namespace segments followed by
/// query parameters in sorted order.
///
/// ```
/// use trackerkit::cache::CacheKey;
///
/// let key = CacheKey::new("queue").segment("12").segment("list").param("limit", 50);
/// assert_eq!(key.to_string(), "queue:12:list?limit=50");
/// assert_eq!(key.namespace(), "queue:12:list");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    segments: Vec<String>,
    params: BTreeMap<String, String>,
}

impl CacheKey {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            segments: vec![namespace.into()],
            params: BTreeMap::new(),
        }
    }

    pub fn segment(mut self, segment: impl fmt::Display) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// The key without its parameters; the prefix to pass to
    /// [`ResponseCache::invalidate`].
    pub fn namespace(&self) -> String {
        self.segments.join(":")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.namespace())?;
        for (index, (name, value)) in self.params.iter().enumerate() {
            let separator = if index == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", separator, name, value)?;
        }
        Ok(())
    }
}
