//! Conversation state for the ticketing assistant.
//!
//! Per-user stores keyed by a hashed identity and bounded by a TTL: the
//! append-only conversation history and the pending ticket-tier selection.
//! Alongside them sit the payment idempotency records and the inbound
//! message dedupe store.

pub mod dedupe;
pub mod history;
pub mod idempotency;
pub mod jsonl;
pub mod key;
pub mod purchase;
pub mod ttl_map;

pub use dedupe::DedupeStore;
pub use history::ConversationStore;
pub use idempotency::IdempotencyGuard;
pub use key::user_key;
pub use purchase::{PendingSelection, SelectionStore};
pub use ttl_map::TtlMap;
