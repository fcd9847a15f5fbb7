use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_8080")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Per-IP token-bucket rate limiting.  `None` disables the limiter.
    #[serde(default = "d_rate_limit")]
    pub rate_limit: Option<RateLimitConfig>,
    /// Maximum number of requests handled concurrently.
    #[serde(default = "d_256")]
    pub max_concurrent_requests: usize,
    /// Maximum accepted request body in bytes.
    #[serde(default = "d_body_limit")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_8080(),
            host: d_host(),
            cors: CorsConfig::default(),
            rate_limit: d_rate_limit(),
            max_concurrent_requests: d_256(),
            max_body_bytes: d_body_limit(),
        }
    }
}

/// Per-IP token-bucket rate limiting configuration.
///
/// `requests_per_second` controls the replenishment rate, `burst_size` the
/// number of requests one IP may fire back to back before being throttled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    /// Origins allowed for CORS.  When empty, only the ticketing backend's
    /// origin (`backend.base_url`) is allowed.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_8080() -> u16 {
    8080
}
fn d_host() -> String {
    "0.0.0.0".into()
}
fn d_rate_limit() -> Option<RateLimitConfig> {
    Some(RateLimitConfig {
        requests_per_second: 5,
        burst_size: 60,
    })
}
fn d_256() -> usize {
    256
}
fn d_body_limit() -> usize {
    256 * 1024
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
