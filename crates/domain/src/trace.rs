use serde::Serialize;

/// Structured trace events emitted across the ticketbot crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LlmRequest {
        provider: String,
        model: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
        function_call: Option<String>,
    },
    BackendCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    ChannelSend {
        kind: String,
        ok: bool,
        duration_ms: u64,
    },
    TurnAppend {
        user_key: String,
        state: String,
        turns: usize,
    },
    TurnCompleted {
        user_key: String,
        state: String,
        function: Option<String>,
        duration_ms: u64,
    },
    SelectionStored {
        user_key: String,
        event_id: i64,
        quantity: i64,
    },
    PaymentAdmitted {
        reference: String,
        duplicate: bool,
    },
    PaymentJob {
        reference: String,
        attempt: u32,
        ok: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "tb_event");
    }
}
