//! Periodic housekeeping: drop expired histories, selections, idempotency
//! and inbound dedupe records, and forget idle turn gates.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tb_sessions::{ConversationStore, DedupeStore, IdempotencyGuard, SelectionStore};

use super::session_lock::SessionLockMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub histories: usize,
    pub selections: usize,
    pub payments: usize,
    pub inbound: usize,
    pub gates: usize,
}

pub struct Sweeper {
    pub history: Arc<ConversationStore>,
    pub selections: Arc<SelectionStore>,
    pub idempotency: Arc<IdempotencyGuard>,
    pub dedupe: Arc<DedupeStore>,
    pub gates: Arc<SessionLockMap>,
}

impl Sweeper {
    /// One pass.  A store that fails to purge is logged and skipped.
    pub async fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport {
            gates: self.gates.prune_idle(),
            ..Default::default()
        };

        match self.history.purge_expired_at(now).await {
            Ok(n) => report.histories = n,
            Err(e) => tracing::warn!(error = %e, "history sweep failed"),
        }
        match self.selections.purge_expired_at(now).await {
            Ok(n) => report.selections = n,
            Err(e) => tracing::warn!(error = %e, "selection sweep failed"),
        }
        match self.idempotency.purge_expired_at(now).await {
            Ok(n) => report.payments = n,
            Err(e) => tracing::warn!(error = %e, "idempotency sweep failed"),
        }
        match self.dedupe.purge_expired_at(now).await {
            Ok(n) => report.inbound = n,
            Err(e) => tracing::warn!(error = %e, "inbound dedupe sweep failed"),
        }

        if report != SweepReport::default() {
            tracing::info!(
                histories = report.histories,
                selections = report.selections,
                payments = report.payments,
                inbound = report.inbound,
                gates = report.gates,
                "expired state swept"
            );
        }
        report
    }

    pub fn spawn(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // The first tick completes immediately; skip it so startup is not
            // slowed by a full sweep.
            interval.tick().await;
            loop {
                interval.tick().await;
                self.run_once(Utc::now()).await;
            }
        })
    }
}
