use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tb_domain::error::Result;

/// What an event card needs to render: a poster header, the title and date
/// in the body, and a reply button carrying the event id.
#[derive(Debug, Clone, PartialEq)]
pub struct EventCard {
    pub event_id: i64,
    pub title: String,
    pub date: DateTime<Utc>,
    pub poster: String,
}

/// Outbound side of the messaging channel.
///
/// Every method is a single send; none of them retry. A refused or failed
/// send surfaces as [`tb_domain::Error::Delivery`].
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Mark an inbound message read and show the typing indicator.
    async fn mark_read(&self, message_id: &str) -> Result<()>;

    /// Send a plain text reply. `reply_to` quotes the inbound message.
    async fn send_text(&self, to: &str, reply_to: Option<&str>, body: &str) -> Result<()>;

    /// Ask the user to share their location.
    async fn send_location_request(&self, to: &str, reply_to: &str) -> Result<()>;

    /// Send one interactive event card with a "Select" button.
    async fn send_event_card(&self, to: &str, card: &EventCard) -> Result<()>;
}
