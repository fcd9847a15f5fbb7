//! A small JSON-file-backed map whose entries expire.
//!
//! The whole map lives in memory and is written back to a single JSON file
//! on every mutation, so an entry that was acknowledged survives a restart.
//! Writes run on the blocking pool with the map's lock held.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tb_domain::error::{Error, Result};

use crate::jsonl;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stamped<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct TtlMap<V> {
    inner: Arc<Inner<V>>,
}

struct Inner<V> {
    path: PathBuf,
    ttl: Duration,
    entries: RwLock<HashMap<String, Stamped<V>>>,
}

impl<V> TtlMap<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Load the map from `path`, or start empty when the file is missing.
    /// An unreadable file is logged and replaced.
    pub fn load(path: &Path, ttl: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| jsonl::persistence(parent, e))?;
        }

        let entries = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| jsonl::persistence(path, e))?;
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "discarding unreadable ttl map");
                HashMap::new()
            })
        } else {
            HashMap::new()
        };

        Ok(Self {
            inner: Arc::new(Inner {
                path: path.to_path_buf(),
                ttl,
                entries: RwLock::new(entries),
            }),
        })
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        self.inner
            .entries
            .read()
            .get(key)
            .filter(|s| s.expires_at > now)
            .map(|s| s.value.clone())
    }

    pub fn contains_at(&self, key: &str, now: DateTime<Utc>) -> bool {
        self.get_at(key, now).is_some()
    }

    /// Insert or overwrite `key`, expiring `ttl` after `now`.
    pub async fn insert_at(&self, key: &str, value: V, now: DateTime<Utc>) -> Result<()> {
        let key = key.to_owned();
        self.with_entries(move |inner, entries| {
            inner.put(entries, key, value, now)?;
            Ok(())
        })
        .await
    }

    /// Insert `key` unless a live entry already holds it.  Returns `false`
    /// (and writes nothing) when one does.  The check and the write happen
    /// under one lock.
    pub async fn insert_if_absent_at(&self, key: &str, value: V, now: DateTime<Utc>) -> Result<bool> {
        let key = key.to_owned();
        self.with_entries(move |inner, entries| {
            if entries.get(&key).is_some_and(|s| s.expires_at > now) {
                return Ok(false);
            }
            inner.put(entries, key, value, now)?;
            Ok(true)
        })
        .await
    }

    /// Drop expired entries.  Returns how many were removed.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.with_entries(move |inner, entries| {
            let before = entries.len();
            entries.retain(|_, s| s.expires_at > now);
            let removed = before - entries.len();
            if removed > 0 {
                inner.write(entries)?;
            }
            Ok(removed)
        })
        .await
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against the locked entries on the blocking pool.
    async fn with_entries<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Inner<V>, &mut HashMap<String, Stamped<V>>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let mut entries = inner.entries.write();
            f(&*inner, &mut *entries)
        })
        .await
        .map_err(|e| Error::Persistence(format!("spawn_blocking join: {e}")))?
    }
}

impl<V: Serialize> Inner<V> {
    fn put(
        &self,
        entries: &mut HashMap<String, Stamped<V>>,
        key: String,
        value: V,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let previous = entries.insert(
            key.clone(),
            Stamped {
                value,
                expires_at: now + self.ttl,
            },
        );
        if let Err(e) = self.write(entries) {
            // Keep memory and disk in agreement.
            match previous {
                Some(p) => entries.insert(key, p),
                None => entries.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn write(&self, entries: &HashMap<String, Stamped<V>>) -> Result<()> {
        let json = serde_json::to_vec(entries)
            .map_err(|e| Error::Persistence(format!("serializing ttl map: {e}")))?;
        jsonl::write_atomic(&self.path, &json)
    }
}
