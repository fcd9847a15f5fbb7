use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Ticketing backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Origin of the ticketing service (e.g. `https://tickets.example.com`).
    /// Also the only CORS origin allowed by default.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Path prefix for the bot-facing API.
    #[serde(default = "d_api_prefix")]
    pub api_prefix: String,
    /// Environment variable holding the bearer token.  The same secret keys
    /// the HMAC on payment callbacks.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            api_prefix: d_api_prefix(),
            api_key_env: d_api_key_env(),
            timeout_ms: d_30000(),
        }
    }
}

impl BackendConfig {
    /// Base URL the ticketing client prefixes every endpoint with.
    pub fn api_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_prefix.trim_matches('/')
        )
    }
}

fn d_base_url() -> String {
    "http://localhost:3000".into()
}
fn d_api_prefix() -> String {
    "/api/whatsapp".into()
}
fn d_api_key_env() -> String {
    "BACKEND_SERVICE_API_KEY".into()
}
fn d_30000() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_joins_without_double_slashes() {
        let cfg = BackendConfig {
            base_url: "https://tickets.example.com/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.api_url(), "https://tickets.example.com/api/whatsapp");
    }
}
