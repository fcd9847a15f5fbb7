//! Append-only, TTL-bounded conversation histories.
//!
//! Each user gets a `<userKey>.jsonl` file under `conversations/`, one turn
//! per line.  An in-memory write-through cache avoids re-reading the file on
//! every turn; disk I/O runs on the blocking pool.
//!
//! Expiry is derived from the newest turn: a history whose last turn is older
//! than the TTL is gone.  Every append stamps its turns with the append time,
//! so an active conversation keeps pushing its own expiry forward.
//!
//! File writes and sweep removals take one store-wide lock, and the sweep
//! re-reads a file under it before deleting, so a conversation restarted
//! mid-sweep is never removed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tb_domain::conversation::Turn;
use tb_domain::error::{Error, Result};
use tb_domain::trace::TraceEvent;

use crate::jsonl;
use crate::key::user_key;

pub struct ConversationStore {
    dir: PathBuf,
    ttl: Duration,
    cache: RwLock<HashMap<String, Vec<Turn>>>,
    files: Arc<Mutex<()>>,
}

impl ConversationStore {
    /// Open (or create) the store under `state_path/conversations`.
    pub fn new(state_path: &Path, ttl: Duration) -> Result<Self> {
        let dir = state_path.join("conversations");
        std::fs::create_dir_all(&dir).map_err(|e| jsonl::persistence(&dir, e))?;
        Ok(Self {
            dir,
            ttl,
            cache: RwLock::new(HashMap::new()),
            files: Arc::new(Mutex::new(())),
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Append turns to a user's history, refreshing its expiry.
    pub async fn append(&self, user_id: &str, turns: Vec<Turn>) -> Result<()> {
        self.append_at(user_id, turns, Utc::now()).await
    }

    pub async fn append_at(
        &self,
        user_id: &str,
        mut turns: Vec<Turn>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if turns.is_empty() {
            return Ok(());
        }
        for turn in &mut turns {
            turn.recorded_at = now;
        }

        let key = user_key(user_id);
        let existing = self.load(&key).await?;
        let expired = is_expired(&existing, now, self.ttl);

        let path = self.path_for(&key);
        let to_write = turns.clone();
        let files = Arc::clone(&self.files);
        blocking(move || {
            let _files = files.lock();
            // A stale history is dropped before the new turns start a fresh one.
            if expired {
                jsonl::remove(&path)?;
            }
            jsonl::append_lines(&path, &to_write)
        })
        .await?;

        let total = {
            let mut cache = self.cache.write();
            let entry = cache.entry(key.clone()).or_default();
            if expired {
                entry.clear();
            }
            entry.extend(turns.iter().cloned());
            entry.len()
        };

        if let Some(last) = turns.last() {
            TraceEvent::TurnAppend {
                user_key: key,
                state: last.state.to_string(),
                turns: total,
            }
            .emit();
        }

        Ok(())
    }

    /// The user's full history in append order; empty when none exists or it
    /// has expired.
    pub async fn read(&self, user_id: &str) -> Result<Vec<Turn>> {
        self.read_at(user_id, Utc::now()).await
    }

    pub async fn read_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<Vec<Turn>> {
        let key = user_key(user_id);
        let turns = self.load(&key).await?;
        if is_expired(&turns, now, self.ttl) {
            if self.remove_if_expired(&key, now).await? {
                tracing::debug!(user_key = %key, "conversation expired");
            }
            return Ok(Vec::new());
        }
        Ok(turns)
    }

    /// Remove every expired history from disk and cache.  Returns how many
    /// were removed.
    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut removed = 0usize;
        for key in self.expired_keys_at(now).await? {
            if self.remove_if_expired(&key, now).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(removed, "purged expired conversations");
        }
        Ok(removed)
    }

    /// Keys whose files looked expired (or empty) at `now`.  A snapshot: each
    /// is checked again before removal.
    async fn expired_keys_at(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let dir = self.dir.clone();
        let ttl = self.ttl;
        blocking(move || {
            let mut keys = Vec::new();
            let entries = std::fs::read_dir(&dir).map_err(|e| jsonl::persistence(&dir, e))?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                    continue;
                }
                let turns: Vec<Turn> = jsonl::read_lines(&path)?;
                if turns.is_empty() || is_expired(&turns, now, ttl) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        keys.push(stem.to_owned());
                    }
                }
            }
            Ok(keys)
        })
        .await
    }

    /// Delete `key`'s history if it is still expired at `now`, re-reading the
    /// file under the store lock.
    async fn remove_if_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool> {
        let path = self.path_for(key);
        let ttl = self.ttl;
        let files = Arc::clone(&self.files);
        // (file is gone afterwards, this call removed it)
        let (gone, removed) = blocking(move || {
            let _files = files.lock();
            if !path.exists() {
                return Ok((true, false));
            }
            let turns: Vec<Turn> = jsonl::read_lines(&path)?;
            if !turns.is_empty() && !is_expired(&turns, now, ttl) {
                return Ok((false, false));
            }
            jsonl::remove(&path)?;
            Ok((true, true))
        })
        .await?;

        if gone {
            self.cache.write().remove(key);
        }
        Ok(removed)
    }

    // ── Private helpers ───────────────────────────────────────────────

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.jsonl"))
    }

    async fn load(&self, key: &str) -> Result<Vec<Turn>> {
        // Fast path: return from cache.
        {
            let cache = self.cache.read();
            if let Some(turns) = cache.get(key) {
                return Ok(turns.clone());
            }
        }

        // Slow path: load from disk and populate the cache.
        let path = self.path_for(key);
        let turns: Vec<Turn> = blocking(move || jsonl::read_lines(&path)).await?;
        {
            let mut cache = self.cache.write();
            cache.entry(key.to_owned()).or_insert_with(|| turns.clone());
        }
        Ok(turns)
    }
}

fn is_expired(turns: &[Turn], now: DateTime<Utc>, ttl: Duration) -> bool {
    turns.last().is_some_and(|t| t.recorded_at + ttl <= now)
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Persistence(format!("spawn_blocking join: {e}")))?
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use tb_domain::conversation::{current_state, ConversationState};
    use tb_domain::tool::Message;

    const USER: &str = "2348012345678";

    fn store(dir: &Path) -> ConversationStore {
        ConversationStore::new(dir, Duration::hours(6)).unwrap()
    }

    fn turn(text: &str, state: ConversationState) -> Turn {
        Turn::new(Message::user(text), state)
    }

    #[tokio::test]
    async fn read_returns_appends_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        for i in 0..5 {
            s.append(USER, vec![turn(&format!("m{i}"), ConversationState::EventQuery)])
                .await
                .unwrap();
        }
        let history = s.read(USER).await.unwrap();
        let texts: Vec<_> = history.iter().filter_map(|t| t.message.text()).collect();
        assert_eq!(texts, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn unknown_user_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let history = s.read("nobody").await.unwrap();
        assert!(history.is_empty());
        assert_eq!(current_state(&history), ConversationState::Initial);
    }

    #[tokio::test]
    async fn history_survives_a_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        store(dir.path())
            .append(
                USER,
                vec![
                    turn("hi", ConversationState::Initial),
                    turn("vip x2", ConversationState::TicketTierSelected),
                ],
            )
            .await
            .unwrap();

        let reopened = store(dir.path());
        let history = reopened.read(USER).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(current_state(&history), ConversationState::TicketTierSelected);
    }

    #[tokio::test]
    async fn history_expires_after_ttl_of_inactivity() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let t0 = Utc::now();
        s.append_at(USER, vec![turn("hi", ConversationState::EventQuery)], t0)
            .await
            .unwrap();

        let just_before = t0 + Duration::hours(6) - Duration::seconds(1);
        assert_eq!(s.read_at(USER, just_before).await.unwrap().len(), 1);

        let after = t0 + Duration::hours(6);
        assert!(s.read_at(USER, after).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_refreshes_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let t0 = Utc::now();
        s.append_at(USER, vec![turn("a", ConversationState::EventQuery)], t0)
            .await
            .unwrap();
        let t1 = t0 + Duration::hours(5);
        s.append_at(USER, vec![turn("b", ConversationState::EventSelected)], t1)
            .await
            .unwrap();

        // Seven hours after the first turn, two after the last.
        let history = s.read_at(USER, t0 + Duration::hours(7)).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn append_after_expiry_starts_a_fresh_history() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let t0 = Utc::now();
        s.append_at(USER, vec![turn("old", ConversationState::AwaitingPayment)], t0)
            .await
            .unwrap();

        let later = t0 + Duration::hours(8);
        s.append_at(USER, vec![turn("new", ConversationState::EventQuery)], later)
            .await
            .unwrap();

        let history = s.read_at(USER, later).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message.text(), Some("new"));

        // The file was rewritten too, not only the cache.
        let reopened = store(dir.path());
        assert_eq!(reopened.read_at(USER, later).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn purge_removes_only_expired_histories() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let t0 = Utc::now();
        s.append_at("old-user", vec![turn("x", ConversationState::EventQuery)], t0)
            .await
            .unwrap();
        s.append_at(
            "active-user",
            vec![turn("y", ConversationState::EventQuery)],
            t0 + Duration::hours(4),
        )
        .await
        .unwrap();

        let removed = s.purge_expired_at(t0 + Duration::hours(7)).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            s.read_at("active-user", t0 + Duration::hours(7)).await.unwrap().len(),
            1
        );
        assert!(!dir
            .path()
            .join("conversations")
            .join(format!("{}.jsonl", user_key("old-user")))
            .exists());
    }

    #[tokio::test]
    async fn sweep_spares_a_history_restarted_after_its_scan() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let t0 = Utc::now();
        s.append_at(USER, vec![turn("old", ConversationState::AwaitingPayment)], t0)
            .await
            .unwrap();

        let now = t0 + Duration::hours(7);
        let stale = s.expired_keys_at(now).await.unwrap();
        assert_eq!(stale, vec![user_key(USER)]);

        // The user writes again between the scan and the removal.
        s.append_at(USER, vec![turn("back again", ConversationState::EventQuery)], now)
            .await
            .unwrap();

        assert!(!s.remove_if_expired(&stale[0], now).await.unwrap());
        let history = s.read_at(USER, now).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].message.text(), Some("back again"));
        assert_eq!(store(dir.path()).read_at(USER, now).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn files_are_named_by_hashed_key() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        s.append(USER, vec![turn("hi", ConversationState::Initial)])
            .await
            .unwrap();
        let names: Vec<String> = std::fs::read_dir(dir.path().join("conversations"))
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{}.jsonl", user_key(USER))]);
        assert!(!names[0].contains(USER));
    }
}
