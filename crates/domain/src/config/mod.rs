mod backend;
mod conversation;
mod llm;
mod observability;
mod payments;
mod server;
mod whatsapp;

pub use backend::*;
pub use conversation::*;
pub use llm::*;
pub use observability::*;
pub use payments::*;
pub use server::*;
pub use whatsapp::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Only structural problems are checked here; whether the named secret
    /// environment variables are set is checked at bootstrap.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                errors.push(ConfigError::error(
                    "server.rate_limit",
                    "requests_per_second and burst_size must be greater than 0",
                ));
            }
        }
        if self
            .server
            .cors
            .allowed_origins
            .iter()
            .any(|o| o == "*")
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        if self.llm.model.is_empty() {
            errors.push(ConfigError::error("llm.model", "model must not be empty"));
        }
        if self.llm.base_url.is_empty() {
            errors.push(ConfigError::error("llm.base_url", "base_url must not be empty"));
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push(ConfigError::warning(
                    "llm.temperature",
                    format!("{t} is outside the usual 0.0..=2.0 range"),
                ));
            }
        }

        if self.backend.base_url.is_empty() {
            errors.push(ConfigError::error("backend.base_url", "base_url must not be empty"));
        } else if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            errors.push(ConfigError::error(
                "backend.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        for (field, value) in [
            ("llm.timeout_ms", self.llm.timeout_ms),
            ("backend.timeout_ms", self.backend.timeout_ms),
            ("whatsapp.timeout_ms", self.whatsapp.timeout_ms),
        ] {
            if value == 0 {
                errors.push(ConfigError::error(field, "timeout must be greater than 0"));
            }
        }

        if self.whatsapp.timezone.parse::<chrono_tz::Tz>().is_err() {
            errors.push(ConfigError::error(
                "whatsapp.timezone",
                format!("unknown IANA time zone {:?}", self.whatsapp.timezone),
            ));
        }

        if self.conversation.history_ttl_hours == 0 {
            errors.push(ConfigError::error(
                "conversation.history_ttl_hours",
                "history TTL must be greater than 0",
            ));
        }
        if self.conversation.selection_ttl_hours == 0 {
            errors.push(ConfigError::error(
                "conversation.selection_ttl_hours",
                "selection TTL must be greater than 0",
            ));
        }
        if self.conversation.inbound_dedupe_ttl_hours == 0 {
            errors.push(ConfigError::error(
                "conversation.inbound_dedupe_ttl_hours",
                "inbound dedupe TTL must be greater than 0",
            ));
        }
        if !self.conversation.serialize_turns {
            errors.push(ConfigError::warning(
                "conversation.serialize_turns",
                "concurrent turns of one user may interleave in the stored history",
            ));
        }

        if self.payments.worker_concurrency == 0 {
            errors.push(ConfigError::error(
                "payments.worker_concurrency",
                "worker_concurrency must be greater than 0",
            ));
        }
        if self.payments.idempotency_ttl_hours == 0 {
            errors.push(ConfigError::error(
                "payments.idempotency_ttl_hours",
                "idempotency TTL must be greater than 0",
            ));
        }
        if self.payments.signature_header.is_empty() {
            errors.push(ConfigError::error(
                "payments.signature_header",
                "signature header must not be empty",
            ));
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            errors.push(ConfigError::error(
                "observability.sample_rate",
                "sample_rate must be within 0.0..=1.0",
            ));
        }

        errors
    }
}
