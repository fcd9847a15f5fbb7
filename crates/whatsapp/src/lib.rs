//! WhatsApp Cloud API channel: inbound webhook types, outbound message
//! payloads and the HTTP client that sends them.

pub mod channel;
pub mod cloud;
pub mod format;
pub mod inbound;
pub mod outbound;

pub use channel::{EventCard, MessagingChannel};
pub use cloud::CloudApiChannel;
pub use inbound::{InboundContent, IncomingMessage, WebhookRequest};
