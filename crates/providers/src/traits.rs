use tb_domain::error::Result;
use tb_domain::tool::{FunctionCall, Message, ToolDefinition, Usage};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// The conversation so far, oldest first.
    pub messages: Vec<Message>,
    /// Functions the model may call.
    pub tools: Vec<ToolDefinition>,
    /// Fixed system instructions sent alongside the conversation.
    pub system_instruction: Option<String>,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Model identifier override. When `None`, the provider uses its default.
    pub model: Option<String>,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Textual content of the response.
    pub content: String,
    /// Function calls emitted by the model.
    pub function_calls: Vec<FunctionCall>,
    pub usage: Option<Usage>,
    /// The model that actually produced the response.
    pub model: String,
    pub finish_reason: Option<String>,
}

/// What the model asked for, once a response is classified.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput {
    Text(String),
    FunctionCall(FunctionCall),
}

impl ChatResponse {
    /// Classify the response.  A function call wins over any accompanying
    /// text; a response with neither yields `None`.
    pub fn output(&self) -> Option<ModelOutput> {
        if let Some(call) = self.function_calls.first() {
            return Some(ModelOutput::FunctionCall(call.clone()));
        }
        if self.content.trim().is_empty() {
            None
        } else {
            Some(ModelOutput::Text(self.content.clone()))
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Core provider trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every LLM adapter implements.
///
/// Adapters translate between the internal message model and the wire
/// format of one provider's HTTP API.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request and wait for the full response.
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse>;

    /// A unique identifier for this provider instance.
    fn provider_id(&self) -> &str;

    /// The model used when a request does not override it.
    fn default_model(&self) -> &str;
}
