//! In-process payment job queue.
//!
//! Admitted notifications become [`PaymentJob`]s on an unbounded channel.
//! A dispatcher hands each job to a worker task once one of the
//! `worker_concurrency` permits is free.  Retryable failures are re-queued
//! after an exponential back-off.  A job that exhausts its retries, or fails
//! with a non-retryable error, moves to the dead-letter journal.
//!
//! Pending jobs are mirrored to `payment_queue.jsonl` under the state path
//! and replayed on start, so an accepted notification survives a restart.
//! Dead jobs are kept in `payment_dead.jsonl` until an operator requeues
//! them with [`requeue_dead`] (`ticketbot payments requeue`).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tb_domain::config::PaymentsConfig;
use tb_domain::error::{Error, Result};
use tb_domain::payment::PaymentNotification;
use tb_domain::trace::TraceEvent;
use tb_sessions::jsonl;
use tokio::sync::{mpsc, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use super::payments::PaymentHandler;

pub const QUEUE_FILE: &str = "payment_queue.jsonl";
pub const DEAD_FILE: &str = "payment_dead.jsonl";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentJob {
    pub id: Uuid,
    pub notification: PaymentNotification,
    /// Zero-based; incremented on every retry.
    pub attempt: u32,
    pub enqueued_at: DateTime<Utc>,
}

impl PaymentJob {
    pub fn new(notification: PaymentNotification) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification,
            attempt: 0,
            enqueued_at: Utc::now(),
        }
    }
}

/// A job that failed for good, with the error that ended it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadJob {
    #[serde(flatten)]
    pub job: PaymentJob,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Journal
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct Journal {
    path: PathBuf,
    dead_path: PathBuf,
    pending: Mutex<Vec<PaymentJob>>,
}

impl Journal {
    fn load(state_path: &Path) -> Result<Self> {
        let path = state_path.join(QUEUE_FILE);
        let pending: Vec<PaymentJob> = jsonl::read_lines(&path)?;
        Ok(Self {
            path,
            dead_path: state_path.join(DEAD_FILE),
            pending: Mutex::new(pending),
        })
    }

    fn snapshot(&self) -> Vec<PaymentJob> {
        self.pending.lock().clone()
    }

    /// Apply `f` to the pending set and rewrite the file, on the blocking
    /// pool.
    async fn update<F>(self: &Arc<Self>, f: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<PaymentJob>) + Send + 'static,
    {
        let journal = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            let mut pending = journal.pending.lock();
            f(&mut pending);
            if pending.is_empty() {
                jsonl::remove(&journal.path)
            } else {
                jsonl::rewrite(&journal.path, &pending)
            }
        })
        .await
        .map_err(|e| Error::Other(format!("journal task failed: {e}")))?
    }

    async fn add(self: &Arc<Self>, job: PaymentJob) -> Result<()> {
        self.update(move |pending| pending.push(job)).await
    }

    async fn replace(self: &Arc<Self>, job: PaymentJob) -> Result<()> {
        self.update(move |pending| {
            if let Some(slot) = pending.iter_mut().find(|j| j.id == job.id) {
                *slot = job;
            }
        })
        .await
    }

    async fn complete(self: &Arc<Self>, id: Uuid) -> Result<()> {
        self.update(move |pending| pending.retain(|j| j.id != id))
            .await
    }

    /// Record `dead` in the dead-letter journal, then clear it from the
    /// pending set.  The pending entry stays when the first write fails.
    async fn bury(self: &Arc<Self>, dead: DeadJob) -> Result<()> {
        let id = dead.job.id;
        let journal = Arc::clone(self);
        tokio::task::spawn_blocking(move || jsonl::append_lines(&journal.dead_path, &[dead]))
            .await
            .map_err(|e| Error::Other(format!("journal task failed: {e}")))??;
        self.complete(id).await
    }
}

/// Jobs in the dead-letter journal under `state_path`.
pub fn dead_letters(state_path: &Path) -> Result<Vec<DeadJob>> {
    jsonl::read_lines(&state_path.join(DEAD_FILE))
}

/// Move every dead job back to the pending journal with a fresh attempt
/// count.  Picked up on the next start; run while the server is stopped.
/// Returns how many jobs were requeued.
pub fn requeue_dead(state_path: &Path) -> Result<usize> {
    let dead = dead_letters(state_path)?;
    if dead.is_empty() {
        return Ok(0);
    }
    let queue_path = state_path.join(QUEUE_FILE);
    let mut pending: Vec<PaymentJob> = jsonl::read_lines(&queue_path)?;
    let count = dead.len();
    pending.extend(dead.into_iter().map(|d| PaymentJob {
        attempt: 0,
        ..d.job
    }));
    jsonl::rewrite(&queue_path, &pending)?;
    jsonl::remove(&state_path.join(DEAD_FILE))?;
    Ok(count)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Queue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Clone, Copy)]
struct RetryPolicy {
    max_retries: u32,
    base: Duration,
}

impl RetryPolicy {
    /// Delay before re-running a job that just failed on `attempt`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Handle used by the payment callback to submit work.
#[derive(Clone)]
pub struct PaymentQueue {
    tx: mpsc::UnboundedSender<PaymentJob>,
    journal: Arc<Journal>,
}

impl PaymentQueue {
    /// Load the journal, start the dispatcher and replay pending jobs.
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &PaymentsConfig,
        state_path: &Path,
        handler: Arc<dyn PaymentHandler>,
    ) -> Result<Self> {
        std::fs::create_dir_all(state_path)?;
        let journal = Arc::new(Journal::load(state_path)?);
        let (tx, rx) = mpsc::unbounded_channel();

        let policy = RetryPolicy {
            max_retries: config.max_retries,
            base: Duration::from_millis(config.retry_base_ms),
        };
        let workers = Arc::new(Semaphore::new(config.worker_concurrency.max(1)));

        let replay = journal.snapshot();
        if !replay.is_empty() {
            tracing::info!(jobs = replay.len(), "replaying pending payment jobs");
        }
        let dead = dead_letters(state_path)?.len();
        if dead > 0 {
            tracing::warn!(jobs = dead, "dead payment jobs waiting for requeue");
        }
        for job in replay {
            let _ = tx.send(job);
        }

        tokio::spawn(dispatch(
            rx,
            tx.clone(),
            handler,
            journal.clone(),
            workers,
            policy,
        ));

        Ok(Self { tx, journal })
    }

    /// Journal and submit `notification`.  Returns the job id.
    pub async fn enqueue(&self, notification: PaymentNotification) -> Result<Uuid> {
        let job = PaymentJob::new(notification);
        let id = job.id;
        self.journal.add(job.clone()).await?;
        self.tx
            .send(job)
            .map_err(|_| Error::Other("payment queue closed".into()))?;
        tracing::debug!(job_id = %id, "payment job enqueued");
        Ok(id)
    }

    /// Jobs accepted but not yet finished.
    pub fn pending(&self) -> usize {
        self.journal.pending.lock().len()
    }
}

async fn dispatch(
    mut rx: mpsc::UnboundedReceiver<PaymentJob>,
    tx: mpsc::UnboundedSender<PaymentJob>,
    handler: Arc<dyn PaymentHandler>,
    journal: Arc<Journal>,
    workers: Arc<Semaphore>,
    policy: RetryPolicy,
) {
    while let Some(job) = rx.recv().await {
        let Ok(permit) = workers.clone().acquire_owned().await else {
            break;
        };
        let span = tracing::info_span!(
            "payment_job",
            job_id = %job.id,
            reference = %job.notification.reference,
            attempt = job.attempt,
        );
        let handler = handler.clone();
        let journal = journal.clone();
        let tx = tx.clone();
        tokio::spawn(
            async move {
                run_job(job, handler.as_ref(), &journal, &tx, policy).await;
                drop(permit);
            }
            .instrument(span),
        );
    }
}

async fn run_job(
    job: PaymentJob,
    handler: &dyn PaymentHandler,
    journal: &Arc<Journal>,
    tx: &mpsc::UnboundedSender<PaymentJob>,
    policy: RetryPolicy,
) {
    let result = handler.handle(&job.notification).await;
    TraceEvent::PaymentJob {
        reference: job.notification.reference.clone(),
        attempt: job.attempt,
        ok: result.is_ok(),
    }
    .emit();

    match result {
        Ok(()) => {
            if let Err(e) = journal.complete(job.id).await {
                tracing::warn!(error = %e, "failed to clear payment job from journal");
            }
        }
        Err(e) if e.is_retryable() && job.attempt < policy.max_retries => {
            let delay = policy.backoff(job.attempt);
            tracing::warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "payment job failed, retrying");
            let mut next = job.clone();
            next.attempt += 1;
            if let Err(e) = journal.replace(next.clone()).await {
                tracing::warn!(error = %e, "failed to journal payment retry");
            }
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = tx.send(next);
            });
        }
        Err(e) => {
            tracing::error!(error = %e, "payment job failed for good, moved to dead letters");
            let dead = DeadJob {
                job,
                error: e.to_string(),
                failed_at: Utc::now(),
            };
            if let Err(e) = journal.bury(dead).await {
                tracing::error!(error = %e, "failed to record dead payment job; left pending");
            }
        }
    }
}
