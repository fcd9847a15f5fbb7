use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Payment reconciliation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    /// Maximum number of payment jobs processed at once.
    #[serde(default = "d_10")]
    pub worker_concurrency: usize,
    /// Attempts after the first before a job is moved to the dead-letter
    /// journal.
    #[serde(default = "d_25")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every attempt.
    #[serde(default = "d_2000")]
    pub retry_base_ms: u64,
    #[serde(default = "d_24")]
    pub idempotency_ttl_hours: u64,
    /// Header carrying the hex HMAC-SHA256 of the payment reference.
    #[serde(default = "d_signature_header")]
    pub signature_header: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            worker_concurrency: d_10(),
            max_retries: d_25(),
            retry_base_ms: d_2000(),
            idempotency_ttl_hours: d_24(),
            signature_header: d_signature_header(),
        }
    }
}

fn d_10() -> usize {
    10
}
fn d_25() -> u32 {
    25
}
fn d_2000() -> u64 {
    2_000
}
fn d_24() -> u64 {
    24
}
fn d_signature_header() -> String {
    "x-webhook-signature".into()
}
