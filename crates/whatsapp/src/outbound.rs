//! Request bodies for the Cloud API `/messages` endpoint.

use serde::Serialize;

const PRODUCT: &str = "whatsapp";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub messaging_product: &'static str,
    pub recipient_type: &'static str,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ReplyContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<Interactive>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyContext {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextBody {
    pub preview_url: bool,
    pub body: String,
}

impl OutboundMessage {
    fn new(to: &str, kind: &'static str, reply_to: Option<&str>) -> Self {
        Self {
            messaging_product: PRODUCT,
            recipient_type: "individual",
            to: to.to_owned(),
            kind,
            context: reply_to.map(|id| ReplyContext {
                message_id: id.to_owned(),
            }),
            text: None,
            interactive: None,
        }
    }

    /// Text reply with link previews on.
    pub fn text(to: &str, reply_to: Option<&str>, body: &str) -> Self {
        Self {
            text: Some(TextBody {
                preview_url: true,
                body: body.to_owned(),
            }),
            ..Self::new(to, "text", reply_to)
        }
    }

    pub fn interactive(to: &str, reply_to: Option<&str>, interactive: Interactive) -> Self {
        Self {
            interactive: Some(interactive),
            ..Self::new(to, "interactive", reply_to)
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Interactive payloads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interactive {
    Button {
        header: Header,
        body: BodyText,
        action: ButtonAction,
    },
    LocationRequestMessage {
        body: BodyText,
        action: NamedAction,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Header {
    Image { image: MediaLink },
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaLink {
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BodyText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonAction {
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Button {
    Reply { reply: ButtonReply },
}

#[derive(Debug, Clone, Serialize)]
pub struct ButtonReply {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedAction {
    pub name: String,
}

pub const LOCATION_PROMPT: &str = "To help us find nearby events, please share your location.";

impl Interactive {
    pub fn location_request() -> Self {
        Interactive::LocationRequestMessage {
            body: BodyText {
                text: LOCATION_PROMPT.into(),
            },
            action: NamedAction {
                name: "send_location".into(),
            },
        }
    }

    /// Image-header card with a single reply button.
    pub fn select_card(poster: &str, body: String, button_id: String) -> Self {
        Interactive::Button {
            header: Header::Image {
                image: MediaLink {
                    link: poster.to_owned(),
                },
            },
            body: BodyText { text: body },
            action: ButtonAction {
                buttons: vec![Button::Reply {
                    reply: ButtonReply {
                        id: button_id,
                        title: "Select".into(),
                    },
                }],
            },
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Read receipt
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize)]
pub struct ReadReceipt {
    pub messaging_product: &'static str,
    pub status: &'static str,
    pub message_id: String,
    pub typing_indicator: TypingIndicator,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypingIndicator {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl ReadReceipt {
    pub fn new(message_id: &str) -> Self {
        Self {
            messaging_product: PRODUCT,
            status: "read",
            message_id: message_id.to_owned(),
            typing_indicator: TypingIndicator { kind: "text" },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_reply_quotes_inbound_message() {
        let v = serde_json::to_value(OutboundMessage::text("234800", Some("wamid.1"), "hi")).unwrap();
        assert_eq!(
            v,
            json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "234800",
                "type": "text",
                "context": {"message_id": "wamid.1"},
                "text": {"preview_url": true, "body": "hi"}
            })
        );
    }

    #[test]
    fn unsolicited_text_has_no_context() {
        let v = serde_json::to_value(OutboundMessage::text("234800", None, "paid")).unwrap();
        assert!(v.get("context").is_none());
        assert!(v.get("interactive").is_none());
    }

    #[test]
    fn location_request_shape() {
        let msg = OutboundMessage::interactive("234800", Some("wamid.2"), Interactive::location_request());
        let v = serde_json::to_value(msg).unwrap();
        assert_eq!(v["type"], "interactive");
        assert_eq!(v["interactive"]["type"], "location_request_message");
        assert_eq!(v["interactive"]["body"]["text"], LOCATION_PROMPT);
        assert_eq!(v["interactive"]["action"], json!({"name": "send_location"}));
    }

    #[test]
    fn select_card_shape() {
        let card = Interactive::select_card("https://cdn/p.png", "BODY".into(), "btn-7".into());
        let v = serde_json::to_value(OutboundMessage::interactive("234800", None, card)).unwrap();
        let i = &v["interactive"];
        assert_eq!(i["type"], "button");
        assert_eq!(
            i["header"],
            json!({"type": "image", "image": {"link": "https://cdn/p.png"}})
        );
        assert_eq!(
            i["action"]["buttons"],
            json!([{"type": "reply", "reply": {"id": "btn-7", "title": "Select"}}])
        );
    }

    #[test]
    fn read_receipt_carries_typing_indicator() {
        let v = serde_json::to_value(ReadReceipt::new("wamid.3")).unwrap();
        assert_eq!(
            v,
            json!({
                "messaging_product": "whatsapp",
                "status": "read",
                "message_id": "wamid.3",
                "typing_indicator": {"type": "text"}
            })
        );
    }
}
