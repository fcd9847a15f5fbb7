use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider identifier used in logs and trace events.
    #[serde(default = "d_provider")]
    pub provider: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default = "d_model")]
    pub model: String,
    /// Environment variable holding the API key.
    #[serde(default = "d_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: d_provider(),
            base_url: d_base_url(),
            model: d_model(),
            api_key_env: d_api_key_env(),
            temperature: None,
            timeout_ms: d_30000(),
        }
    }
}

fn d_provider() -> String {
    "gemini".into()
}
fn d_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn d_model() -> String {
    "gemini-3-flash-preview".into()
}
fn d_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn d_30000() -> u64 {
    30_000
}
