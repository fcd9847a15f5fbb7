//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! [`build_app_state`] is the production boot path: it validates the config,
//! resolves secrets from the environment and builds the three outbound
//! clients.  [`wire`] takes already-built clients, which lets tests run the
//! full HTTP surface against doubles.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tb_domain::config::{Config, ConfigSeverity};
use tb_providers::util::resolve_env;
use tb_providers::{GoogleProvider, LlmProvider};
use tb_sessions::{ConversationStore, DedupeStore, IdempotencyGuard, SelectionStore};
use tb_ticketing::{HttpTicketingBackend, TicketingBackend};
use tb_whatsapp::{CloudApiChannel, MessagingChannel};

use crate::runtime::payments::PaymentReconciler;
use crate::runtime::queue::PaymentQueue;
use crate::runtime::resolver::ContextResolver;
use crate::runtime::session_lock::SessionLockMap;
use crate::runtime::sweep::Sweeper;
use crate::runtime::turn::TurnProcessor;
use crate::state::{AppState, Secrets};

/// The outbound seams, constructed once and shared.
pub struct Services {
    pub llm: Arc<dyn LlmProvider>,
    pub channel: Arc<dyn MessagingChannel>,
    pub backend: Arc<dyn TicketingBackend>,
}

/// Validate config, initialize every subsystem and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Secrets ──────────────────────────────────────────────────────
    let backend_key = resolve_env(&config.backend.api_key_env).context("backend API key")?;
    let secrets = Secrets {
        verify_token: resolve_env(&config.whatsapp.verify_token_env)
            .context("webhook verify token")?,
        business_account_id: resolve_env(&config.whatsapp.business_account_id_env)
            .context("business account id")?,
        signing_key: backend_key.as_bytes().to_vec(),
    };

    // ── LLM provider ─────────────────────────────────────────────────
    let llm_key = resolve_env(&config.llm.api_key_env).context("LLM API key")?;
    let llm: Arc<dyn LlmProvider> = Arc::new(
        GoogleProvider::from_config(&config.llm, llm_key).context("initializing LLM provider")?,
    );
    tracing::info!(
        provider = llm.provider_id(),
        model = llm.default_model(),
        "LLM provider ready"
    );

    // ── Ticketing backend ────────────────────────────────────────────
    let backend: Arc<dyn TicketingBackend> = Arc::new(
        HttpTicketingBackend::new(&config.backend, backend_key)
            .context("initializing ticketing backend client")?,
    );
    tracing::info!(url = %config.backend.api_url(), "ticketing backend client ready");

    // ── Messaging channel ────────────────────────────────────────────
    let messages_url =
        resolve_env(&config.whatsapp.messages_url_env).context("messaging API url")?;
    let access_token =
        resolve_env(&config.whatsapp.access_token_env).context("messaging access token")?;
    let channel: Arc<dyn MessagingChannel> = Arc::new(
        CloudApiChannel::new(&config.whatsapp, messages_url, access_token)
            .context("initializing messaging channel")?,
    );
    tracing::info!(timezone = %config.whatsapp.timezone, "messaging channel ready");

    wire(
        config,
        Services {
            llm,
            channel,
            backend,
        },
        secrets,
    )
}

/// Build the stores and processors around `services`.  Starts the payment
/// queue, so it must run inside a tokio runtime.
pub fn wire(config: Arc<Config>, services: Services, secrets: Secrets) -> anyhow::Result<AppState> {
    let conv = &config.conversation;
    let hours = |h: u64| chrono::Duration::hours(h as i64);

    // ── Stores ───────────────────────────────────────────────────────
    let history = Arc::new(
        ConversationStore::new(&conv.state_path, hours(conv.history_ttl_hours))
            .context("initializing conversation store")?,
    );
    let selections = Arc::new(
        SelectionStore::new(&conv.state_path, hours(conv.selection_ttl_hours))
            .context("initializing selection store")?,
    );
    let idempotency = Arc::new(
        IdempotencyGuard::new(&conv.state_path, hours(config.payments.idempotency_ttl_hours))
            .context("initializing idempotency store")?,
    );
    let dedupe = Arc::new(
        DedupeStore::new(&conv.state_path, hours(conv.inbound_dedupe_ttl_hours))
            .context("initializing inbound dedupe store")?,
    );
    tracing::info!(path = %conv.state_path.display(), "conversation stores ready");

    // ── Turn gates ───────────────────────────────────────────────────
    let session_locks = Arc::new(SessionLockMap::new());

    // ── Turn processor ───────────────────────────────────────────────
    let resolver = Arc::new(ContextResolver::new(
        services.backend.clone(),
        selections.clone(),
    ));
    let mut turns = TurnProcessor::new(
        services.llm.clone(),
        services.channel.clone(),
        resolver,
        history.clone(),
    )
    .with_pacing(Duration::from_millis(config.whatsapp.pacing_ms))
    .with_temperature(config.llm.temperature);
    if conv.serialize_turns {
        turns = turns.with_gate(session_locks.clone());
    }

    // ── Payment reconciliation ───────────────────────────────────────
    let mut reconciler = PaymentReconciler::new(
        services.llm,
        services.channel,
        history.clone(),
        idempotency.clone(),
    )
    .with_temperature(config.llm.temperature);
    if conv.serialize_turns {
        reconciler = reconciler.with_gate(session_locks.clone());
    }
    let payments = PaymentQueue::start(&config.payments, &conv.state_path, Arc::new(reconciler))
        .context("starting payment queue")?;
    tracing::info!(
        workers = config.payments.worker_concurrency,
        pending = payments.pending(),
        "payment queue ready"
    );

    Ok(AppState {
        config,
        turns: Arc::new(turns),
        payments,
        history,
        selections,
        idempotency,
        dedupe,
        session_locks,
        secrets: Arc::new(secrets),
    })
}

/// Spawn the periodic store sweep.  Call after [`build_app_state`] when
/// running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) {
    let every = Duration::from_secs(state.config.conversation.sweep_interval_minutes.max(1) * 60);
    Sweeper {
        history: state.history.clone(),
        selections: state.selections.clone(),
        idempotency: state.idempotency.clone(),
        dedupe: state.dedupe.clone(),
        gates: state.session_locks.clone(),
    }
    .spawn(every);
    tracing::info!(interval_secs = every.as_secs(), "background tasks spawned");
}
