use std::sync::Arc;

use tb_domain::config::Config;
use tb_sessions::{ConversationStore, DedupeStore, IdempotencyGuard, SelectionStore};

use crate::runtime::queue::PaymentQueue;
use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::turn::TurnProcessor;

/// Secrets resolved from the environment once at startup.
pub struct Secrets {
    /// Token the messaging platform echoes back during webhook verification.
    pub verify_token: String,
    /// Only webhooks for this business account are processed.
    pub business_account_id: String,
    /// Key for payment callback signatures (the backend API key).
    pub signing_key: Vec<u8>,
}

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services**: config, turn processor, payment queue
/// - **Stores**: history, selections, idempotency, inbound dedupe
/// - **Concurrency**: per-user turn gates
/// - **Security**: secrets resolved at startup
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub turns: Arc<TurnProcessor>,
    pub payments: PaymentQueue,

    // ── Stores ────────────────────────────────────────────────────────
    pub history: Arc<ConversationStore>,
    pub selections: Arc<SelectionStore>,
    /// Processed payment references; checked on admission.
    pub idempotency: Arc<IdempotencyGuard>,
    /// Inbound message ids already accepted; redeliveries are dropped.
    pub dedupe: Arc<DedupeStore>,

    // ── Concurrency ───────────────────────────────────────────────────
    pub session_locks: Arc<SessionLockMap>,

    // ── Security ──────────────────────────────────────────────────────
    pub secrets: Arc<Secrets>,
}
