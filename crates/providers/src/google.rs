//! Google Gemini adapter.
//!
//! Implements the Gemini `generateContent` API with function declarations.
//! Auth is via an API key passed as a query parameter (`key={api_key}`).

use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tb_domain::config::LlmConfig;
use tb_domain::error::{Error, Result};
use tb_domain::tool::{FunctionCall, Message, Part, Role, ToolDefinition, Usage};
use tb_domain::trace::TraceEvent;

use crate::traits::{ChatRequest, ChatResponse, LlmProvider};
use crate::util::from_reqwest;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Adapter struct
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An LLM provider adapter for the Google Gemini API.
pub struct GoogleProvider {
    id: String,
    base_url: String,
    api_key: String,
    default_model: String,
    client: reqwest::Client,
}

impl GoogleProvider {
    /// Create a provider from the `[llm]` config section and a resolved key.
    pub fn from_config(cfg: &LlmConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: cfg.provider.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
            default_model: cfg.model.clone(),
            client,
        })
    }

    // ── Internal helpers ───────────────────────────────────────────

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        )
    }

    fn build_body(&self, req: &ChatRequest) -> Value {
        let contents: Vec<Value> = req.messages.iter().map(message_to_gemini).collect();

        let mut body = json!({
            "contents": contents,
        });

        if let Some(si) = &req.system_instruction {
            body["systemInstruction"] = json!({
                "parts": [{"text": si}]
            });
        }

        if !req.tools.is_empty() {
            let function_declarations: Vec<Value> = req.tools.iter().map(tool_to_gemini).collect();
            body["tools"] = json!([{
                "functionDeclarations": function_declarations,
            }]);
        }

        if let Some(temp) = req.temperature {
            body["generationConfig"] = json!({ "temperature": temp });
        }

        body
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message serialization helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn message_to_gemini(msg: &Message) -> Value {
    // Gemini only knows "user" and "model"; injected results speak as the user.
    let role = match msg.role {
        Role::Model => "model",
        Role::User | Role::System => "user",
    };
    json!({
        "role": role,
        "parts": [part_to_gemini(&msg.payload)],
    })
}

fn part_to_gemini(part: &Part) -> Value {
    match part {
        Part::Text { text } => json!({ "text": text }),
        Part::FunctionCall(call) => json!({
            "functionCall": {
                "name": call.name,
                "args": call.args,
            }
        }),
        Part::FunctionResult { name, response } => {
            // functionResponse.response must be a JSON object.
            let response = match response {
                Value::Object(_) => response.clone(),
                other => json!({ "content": other }),
            };
            json!({
                "functionResponse": {
                    "name": name,
                    "response": response,
                }
            })
        }
    }
}

fn tool_to_gemini(tool: &ToolDefinition) -> Value {
    json!({
        "name": tool.name,
        "description": tool.description,
        "parameters": tool.parameters,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response deserialization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn parse_gemini_response(body: &Value, model: &str, provider: &str) -> Result<ChatResponse> {
    let candidate = body
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|a| a.first())
        .ok_or_else(|| Error::Provider {
            provider: provider.into(),
            message: "no candidates in response".into(),
        })?;

    let parts = candidate
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array());

    let mut text_content = String::new();
    let mut function_calls: Vec<FunctionCall> = Vec::new();

    if let Some(parts) = parts {
        for part in parts {
            if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                text_content.push_str(text);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let args = fc
                    .get("args")
                    .and_then(|v| v.as_object())
                    .cloned()
                    .unwrap_or_default();
                function_calls.push(FunctionCall { name, args });
            }
        }
    }

    let finish_reason = candidate
        .get("finishReason")
        .and_then(|v| v.as_str())
        .map(|s| match s {
            "STOP" => "stop".to_string(),
            "MAX_TOKENS" => "length".to_string(),
            other => other.to_lowercase(),
        });

    let usage = body.get("usageMetadata").and_then(parse_gemini_usage);

    Ok(ChatResponse {
        content: text_content,
        function_calls,
        usage,
        model: model.to_string(),
        finish_reason,
    })
}

fn parse_gemini_usage(v: &Value) -> Option<Usage> {
    let prompt = v.get("promptTokenCount")?.as_u64()? as u32;
    let completion = v
        .get("candidatesTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;
    let total = v
        .get("totalTokenCount")
        .and_then(|v| v.as_u64())
        .unwrap_or((prompt + completion) as u64) as u32;
    Some(Usage {
        prompt_tokens: prompt,
        completion_tokens: completion,
        total_tokens: total,
    })
}

/// Redact API key from URL for safe logging.
fn redact_url_key(url: &str) -> String {
    if let Some(idx) = url.find("key=") {
        let prefix = &url[..idx + 4];
        let rest = &url[idx + 4..];
        let end = rest.find('&').unwrap_or(rest.len());
        format!("{prefix}[REDACTED]{}", &rest[end..])
    } else {
        url.to_string()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait::async_trait]
impl LlmProvider for GoogleProvider {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let url = self.generate_url(&model);
        let body = self.build_body(req);
        let started = Instant::now();

        tracing::debug!(
            provider = %self.id,
            url = %redact_url_key(&url),
            messages = req.messages.len(),
            "gemini chat request"
        );

        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = resp.status();
        let resp_text = resp.text().await.map_err(from_reqwest)?;

        if !status.is_success() {
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {} - {}", status.as_u16(), resp_text),
            });
        }

        let resp_json: Value = serde_json::from_str(&resp_text)?;
        let parsed = parse_gemini_response(&resp_json, &model, &self.id)?;

        TraceEvent::LlmRequest {
            provider: self.id.clone(),
            model: model.clone(),
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: parsed.usage.map(|u| u.prompt_tokens),
            completion_tokens: parsed.usage.map(|u| u.completion_tokens),
            function_call: parsed.function_calls.first().map(|c| c.name.clone()),
        }
        .emit();

        Ok(parsed)
    }

    fn provider_id(&self) -> &str {
        &self.id
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
