use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// WhatsApp Cloud API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Environment variable holding the full `/messages` endpoint URL of the
    /// business phone number (e.g. `https://graph.facebook.com/v21.0/<id>/messages`).
    #[serde(default = "d_messages_url_env")]
    pub messages_url_env: String,
    #[serde(default = "d_access_token_env")]
    pub access_token_env: String,
    /// Token Meta echoes back during webhook verification.
    #[serde(default = "d_verify_token_env")]
    pub verify_token_env: String,
    /// Inbound webhooks whose `entry[0].id` differs from this account are ignored.
    #[serde(default = "d_business_account_id_env")]
    pub business_account_id_env: String,
    /// Delay between consecutive event cards, to stay under the channel's
    /// per-recipient send rate.
    #[serde(default = "d_300")]
    pub pacing_ms: u64,
    #[serde(default = "d_30000")]
    pub timeout_ms: u64,
    /// IANA zone used when rendering event dates.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            messages_url_env: d_messages_url_env(),
            access_token_env: d_access_token_env(),
            verify_token_env: d_verify_token_env(),
            business_account_id_env: d_business_account_id_env(),
            pacing_ms: d_300(),
            timeout_ms: d_30000(),
            timezone: d_timezone(),
        }
    }
}

fn d_messages_url_env() -> String {
    "WHATSAPP_MESSAGING_API_URL".into()
}
fn d_access_token_env() -> String {
    "WHATSAPP_USER_ACCESS_TOKEN".into()
}
fn d_verify_token_env() -> String {
    "WHATSAPP_WEBHOOK_VERIFICATION_TOKEN".into()
}
fn d_business_account_id_env() -> String {
    "WHATSAPP_BUSINESS_ACCOUNT_ID".into()
}
fn d_300() -> u64 {
    300
}
fn d_30000() -> u64 {
    30_000
}
fn d_timezone() -> String {
    "Africa/Lagos".into()
}
