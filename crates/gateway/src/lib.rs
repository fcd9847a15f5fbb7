//! Ticketbot gateway: the webhook server, the turn processor and payment
//! reconciliation.
//!
//! The binary in `main.rs` wires tracing, the HTTP layers and the CLI around
//! the modules exported here.

pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod runtime;
pub mod state;
