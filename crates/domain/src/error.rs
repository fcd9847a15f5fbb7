/// Shared error type used across all ticketbot crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// The LLM provider rejected the request or returned garbage.
    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    /// The ticketing backend answered with a non-success status or a body
    /// that did not decode.
    #[error("backend request failed ({status}): {message}")]
    BackendRequestFailed { status: u16, message: String },

    /// The messaging channel refused or failed a send.
    #[error("channel delivery failed: {0}")]
    Delivery(String),

    /// The conversation / selection / idempotency store could not be used.
    #[error("persistence: {0}")]
    Persistence(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    // ── Turn invariants ────────────────────────────────────────────────
    #[error("invalid function name: {0}")]
    InvalidFunctionName(String),

    #[error("unknown model response type")]
    UnknownModelResponseType,

    #[error("incorrect model response: expected a function call")]
    ExpectedFunctionCall,

    #[error("incorrect function call from model: expected {expected}, received {received}")]
    WrongFunctionCall { expected: String, received: String },

    #[error("empty conversation history")]
    EmptyConversationHistory,

    #[error("missing function call in latest conversation context")]
    MissingFunctionCall,

    #[error("invalid payload type received from backend service")]
    InvalidContextPayload,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a failed payment job should be handed back to the queue for
    /// another attempt.  Invariant violations will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Http(_)
                | Error::Timeout(_)
                | Error::Provider { .. }
                | Error::Delivery(_)
                | Error::Persistence(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
