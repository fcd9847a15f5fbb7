//! Client for the ticketing backend's bot-facing API.
//!
//! [`TicketingBackend`] is the seam the context resolver depends on;
//! [`HttpTicketingBackend`] is the production implementation.

pub mod backend;
pub mod rest;
pub mod types;

pub use backend::TicketingBackend;
pub use rest::HttpTicketingBackend;
pub use types::{ApiEnvelope, Event, PurchaseRequest, TicketTier};
