//! Conversation turns and the dialogue state machine.
//!
//! State is never stored on its own: every persisted [`Turn`] carries the
//! state the conversation was in when it was written, and the current state
//! is read off the most recent turn.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tool::{FunctionCall, Message, Part};

/// Dialogue stage attached to every turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Initial,
    EventQuery,
    EventSelected,
    TicketTierSelected,
    AwaitingPayment,
    Completed,
    /// Reached from any state when the model could not generate a reply.
    ResponseError,
}

impl ConversationState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::EventQuery => "event_query",
            Self::EventSelected => "event_selected",
            Self::TicketTierSelected => "ticket_tier_selected",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Completed => "completed",
            Self::ResponseError => "response_error",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable exchange unit in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(flatten)]
    pub message: Message,
    pub state: ConversationState,
    pub recorded_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(message: Message, state: ConversationState) -> Self {
        Self {
            message,
            state,
            recorded_at: Utc::now(),
        }
    }

    pub fn function_call(&self) -> Option<&FunctionCall> {
        self.message.as_function_call()
    }

    pub fn payload(&self) -> &Part {
        &self.message.payload
    }
}

/// Current state of a history: the state of the last turn, or `Initial`.
pub fn current_state(history: &[Turn]) -> ConversationState {
    history.last().map(|t| t.state).unwrap_or_default()
}

/// The most recent function call the model made, scanning backwards.
pub fn last_function_call(history: &[Turn]) -> Option<&FunctionCall> {
    history.iter().rev().find_map(Turn::function_call)
}
