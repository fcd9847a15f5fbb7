//! Dedup records for payment notifications.
//!
//! Admission checks [`IdempotencyGuard::exists`]; the record is only written
//! once reconciliation has delivered its message, so two identical
//! notifications arriving before the first finishes can both be admitted.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use tb_domain::error::Result;

use crate::ttl_map::TtlMap;

pub struct IdempotencyGuard {
    map: TtlMap<DateTime<Utc>>,
}

impl IdempotencyGuard {
    /// Open the guard at `state_path/processed_payments.json`.
    pub fn new(state_path: &Path, ttl: Duration) -> Result<Self> {
        Ok(Self {
            map: TtlMap::load(&state_path.join("processed_payments.json"), ttl)?,
        })
    }

    pub fn exists(&self, reference: &str) -> bool {
        self.exists_at(reference, Utc::now())
    }

    pub fn exists_at(&self, reference: &str, now: DateTime<Utc>) -> bool {
        self.map.contains_at(reference, now)
    }

    /// Record `reference` as processed.  Returns `false` (and writes nothing)
    /// when a live record already exists.
    pub async fn mark_processed(&self, reference: &str) -> Result<bool> {
        self.mark_processed_at(reference, Utc::now()).await
    }

    pub async fn mark_processed_at(&self, reference: &str, now: DateTime<Utc>) -> Result<bool> {
        self.map.insert_if_absent_at(reference, now, now).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<usize> {
        self.map.purge_expired_at(now).await
    }
}
