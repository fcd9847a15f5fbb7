//! Pending ticket-tier selections.
//!
//! At most one selection per user: a new one overwrites the previous, which
//! abandons whatever flow it belonged to.  Selections are read, never
//! deleted, when the purchase is initiated, and simply expire.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tb_domain::error::Result;
use tb_domain::trace::TraceEvent;

use crate::key::user_key;
use crate::ttl_map::TtlMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSelection {
    pub event_id: i64,
    pub tier_name: String,
    pub quantity: i64,
}

pub struct SelectionStore {
    map: TtlMap<PendingSelection>,
}

impl SelectionStore {
    /// Open the store at `state_path/selections.json`.
    pub fn new(state_path: &Path, ttl: Duration) -> Result<Self> {
        Ok(Self {
            map: TtlMap::load(&state_path.join("selections.json"), ttl)?,
        })
    }

    pub async fn put(&self, user_id: &str, selection: PendingSelection) -> Result<()> {
        self.put_at(user_id, selection, Utc::now()).await
    }

    pub async fn put_at(&self, user_id: &str, selection: PendingSelection, now: DateTime<Utc>) -> Result<()> {
        let key = user_key(user_id);
        let event_id = selection.event_id;
        let quantity = selection.quantity;
        self.map.insert_at(&key, selection, now).await?;

        TraceEvent::SelectionStored {
            user_key: key,
            event_id,
            quantity,
        }
        .emit();
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> Option<PendingSelection> {
        self.get_at(user_id, Utc::now())
    }

    pub fn get_at(&self, user_id: &str, now: DateTime<Utc>) -> Option<PendingSelection> {
        self.map.get_at(&user_key(user_id), now)
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.map.purge_expired_at(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(tier: &str, quantity: i64) -> PendingSelection {
        PendingSelection {
            event_id: 42,
            tier_name: tier.into(),
            quantity,
        }
    }

    #[tokio::test]
    async fn later_selection_overwrites_earlier() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path(), Duration::hours(3)).unwrap();
        store.put("u1", selection("Regular", 4)).await.unwrap();
        store.put("u1", selection("VIP", 2)).await.unwrap();
        assert_eq!(store.get("u1"), Some(selection("VIP", 2)));
    }

    #[tokio::test]
    async fn selection_is_read_not_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path(), Duration::hours(3)).unwrap();
        store.put("u1", selection("VIP", 1)).await.unwrap();
        assert!(store.get("u1").is_some());
        assert!(store.get("u1").is_some());
    }

    #[tokio::test]
    async fn selection_expires_after_three_hours() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path(), Duration::hours(3)).unwrap();
        let t0 = Utc::now();
        store.put_at("u1", selection("VIP", 1), t0).await.unwrap();
        assert!(store.get_at("u1", t0 + Duration::minutes(179)).is_some());
        assert!(store.get_at("u1", t0 + Duration::hours(3)).is_none());
    }

    #[tokio::test]
    async fn selections_are_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = SelectionStore::new(dir.path(), Duration::hours(3)).unwrap();
        store.put("u1", selection("VIP", 1)).await.unwrap();
        assert!(store.get("u2").is_none());
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let json = serde_json::to_value(selection("VIP", 2)).unwrap();
        assert_eq!(json["eventId"], 42);
        assert_eq!(json["tierName"], "VIP");
    }
}
