//! Core runtime: the turn processor, the context resolver, payment
//! reconciliation and the background housekeeping that keeps the stores
//! bounded.

pub mod payments;
pub mod queue;
pub mod resolver;
pub mod session_lock;
pub mod sweep;
pub mod turn;

#[cfg(test)]
pub(crate) mod testing;

use tb_domain::function::definitions;
use tb_domain::instructions::SYSTEM_INSTRUCTIONS;
use tb_domain::tool::Message;
use tb_providers::ChatRequest;

/// Every model request carries the full history, the fixed function schema
/// and the assistant's system instructions.
pub fn chat_request(messages: Vec<Message>, temperature: Option<f32>) -> ChatRequest {
    ChatRequest {
        messages,
        tools: definitions(),
        system_instruction: Some(SYSTEM_INSTRUCTIONS.trim().to_owned()),
        temperature,
        model: None,
    }
}
