//! Inbound message deduplication.
//!
//! The messaging platform redelivers a webhook until it sees a 200, and
//! sometimes after.  Each message id is claimed once; later deliveries of
//! the same id inside the TTL are ignored.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tb_domain::error::Result;

use crate::ttl_map::TtlMap;

pub struct DedupeStore {
    map: TtlMap<DateTime<Utc>>,
}

impl DedupeStore {
    /// Open the store at `state_path/inbound_messages.json`.
    pub fn new(state_path: &Path, ttl: Duration) -> Result<Self> {
        Ok(Self {
            map: TtlMap::load(&state_path.join("inbound_messages.json"), ttl)?,
        })
    }

    /// Claim `message_id`.  Returns `true` the first time, `false` for a
    /// redelivery.
    pub async fn claim(&self, message_id: &str) -> Result<bool> {
        self.claim_at(message_id, Utc::now()).await
    }

    pub async fn claim_at(&self, message_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.map.insert_if_absent_at(message_id, now, now).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.map.purge_expired_at(now).await
    }
}
