//! Per-user turn gate.
//!
//! Only one turn (or payment follow-up) runs against a user's history at a
//! time. A second message from the same user waits for the first to finish,
//! so turns land in the store in arrival order.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tb_domain::error::{Error, Result};
use tb_sessions::user_key;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Each hashed user key maps to a `Semaphore(1)`.
pub struct SessionLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for SessionLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `user_id`'s history.  The permit
    /// releases on drop.
    pub async fn acquire(&self, user_id: &str) -> Result<OwnedSemaphorePermit> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(user_key(user_id))
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned()
            .await
            .map_err(|_| Error::Other("turn gate closed".into()))
    }

    /// Number of tracked users.
    pub fn user_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Drop gates nobody holds or waits on.
    pub fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock();
        let before = locks.len();
        locks.retain(|_, sem| Arc::strong_count(sem) > 1 || sem.available_permits() == 0);
        before - locks.len()
    }
}
