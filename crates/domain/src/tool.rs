use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured function call emitted by the model.
///
/// Provider adapters convert their wire format into this shape; the
/// arguments are kept as a JSON object so that scalars and lists survive
/// untouched until the context resolver maps them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Map::new(),
        }
    }

    /// Builder-style helper used by tests and the payment pipeline.
    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn arg(&self, key: &str) -> Option<&Value> {
        self.args.get(key)
    }
}

/// Function definition exposed to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the function's parameters.
    pub parameters: Value,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    /// Results injected by the system (backend context, payment outcomes).
    System,
}

/// The single payload carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    FunctionCall(FunctionCall),
    FunctionResult { name: String, response: Value },
}

/// A message in the conversation (provider-agnostic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub payload: Part,
}

// ── Convenience constructors ───────────────────────────────────────

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            payload: Part::Text { text: text.into() },
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            payload: Part::Text { text: text.into() },
        }
    }

    pub fn function_call(call: FunctionCall) -> Self {
        Self {
            role: Role::Model,
            payload: Part::FunctionCall(call),
        }
    }

    pub fn function_result(name: impl Into<String>, response: Value) -> Self {
        Self {
            role: Role::System,
            payload: Part::FunctionResult {
                name: name.into(),
                response,
            },
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match &self.payload {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        }
    }
}

/// Token usage for a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
