//! Webhook notification bodies delivered by the Cloud API.
//!
//! Only the parts the assistant reacts to are modelled. Status updates and
//! unsupported message kinds (images, reactions, ...) decode fine and are
//! then skipped by [`WebhookRequest::route`] / [`IncomingMessage::content`].

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookRequest {
    #[serde(default)]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Business account the notification belongs to.
    pub id: String,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub value: ChangeValue,
    #[serde(default)]
    pub field: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeValue {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub context: Option<MessageContext>,
    /// Sender phone number; doubles as the conversation owner.
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub location: Option<LocationContent>,
    #[serde(default)]
    pub interactive: Option<InteractiveContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationContent {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractiveContent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub button_reply: Option<ButtonReplyContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ButtonReplyContent {
    pub id: String,
    pub title: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The three message shapes a turn can start from.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundContent {
    Text(String),
    Location { latitude: f64, longitude: f64 },
    ButtonReply { id: String, title: String },
}

impl IncomingMessage {
    /// `None` for message kinds the assistant does not handle, or when the
    /// declared kind and the populated field disagree.
    pub fn content(&self) -> Option<InboundContent> {
        match self.kind.as_str() {
            "text" => self
                .text
                .as_ref()
                .map(|t| InboundContent::Text(t.body.clone())),
            "location" => self.location.as_ref().map(|l| InboundContent::Location {
                latitude: l.latitude,
                longitude: l.longitude,
            }),
            "interactive" => self
                .interactive
                .as_ref()
                .and_then(|i| i.button_reply.as_ref())
                .map(|b| InboundContent::ButtonReply {
                    id: b.id.clone(),
                    title: b.title.clone(),
                }),
            _ => None,
        }
    }
}

/// Where a webhook notification should go.
#[derive(Debug)]
pub enum WebhookTarget<'a> {
    NoEntry,
    /// `entry[0].id` is not our business account.
    ForeignAccount(&'a str),
    NoMessages,
    Message(&'a IncomingMessage),
}

impl WebhookRequest {
    /// Pick the first message of the first change of the first entry.
    pub fn route(&self, business_account_id: &str) -> WebhookTarget<'_> {
        let Some(entry) = self.entry.first() else {
            return WebhookTarget::NoEntry;
        };
        if entry.id != business_account_id {
            return WebhookTarget::ForeignAccount(&entry.id);
        }
        match entry
            .changes
            .first()
            .and_then(|c| c.value.messages.first())
        {
            Some(msg) => WebhookTarget::Message(msg),
            None => WebhookTarget::NoMessages,
        }
    }
}
