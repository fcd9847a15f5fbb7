//! Shared domain types for the ticketing assistant.
//!
//! Everything that more than one crate needs to agree on lives here: the
//! error type, configuration, the provider-agnostic conversation model, the
//! fixed function schema exposed to the LLM and the payment notification
//! contract.

pub mod config;
pub mod conversation;
pub mod error;
pub mod function;
pub mod instructions;
pub mod payment;
pub mod tool;
pub mod trace;

pub use conversation::{current_state, ConversationState, Turn};
pub use error::{Error, Result};
pub use function::FunctionName;
