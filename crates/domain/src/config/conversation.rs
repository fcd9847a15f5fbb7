use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversation state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Root directory for histories, pending selections and the payment
    /// journal.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,
    /// Inactivity window after which a history is forgotten.
    #[serde(default = "d_6")]
    pub history_ttl_hours: u64,
    /// Lifetime of a pending ticket-tier selection.
    #[serde(default = "d_3")]
    pub selection_ttl_hours: u64,
    /// How long an inbound message id is remembered for redelivery checks.
    #[serde(default = "d_24")]
    pub inbound_dedupe_ttl_hours: u64,
    /// Serialize concurrent turns of the same user.  When false, turns of
    /// one user may interleave in the stored history.
    #[serde(default = "d_true")]
    pub serialize_turns: bool,
    /// How often expired histories, selections and dedupe records are swept
    /// from disk.
    #[serde(default = "d_15")]
    pub sweep_interval_minutes: u64,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            state_path: d_state_path(),
            history_ttl_hours: d_6(),
            selection_ttl_hours: d_3(),
            inbound_dedupe_ttl_hours: d_24(),
            serialize_turns: true,
            sweep_interval_minutes: d_15(),
        }
    }
}

fn d_state_path() -> PathBuf {
    PathBuf::from("./data/state")
}
fn d_6() -> u64 {
    6
}
fn d_3() -> u64 {
    3
}
fn d_24() -> u64 {
    24
}
fn d_true() -> bool {
    true
}
fn d_15() -> u64 {
    15
}
