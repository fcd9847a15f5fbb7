use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::function::FunctionName;
use crate::tool::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failed,
    Refund,
}

/// Payment outcome delivered by the ticketing backend's webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub reference: String,
    pub status: PaymentStatus,
    /// Messaging-channel identity of the buyer.
    #[serde(rename = "phoneId")]
    pub phone_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl PaymentNotification {
    /// Context payload folded into the buyer's conversation.
    pub fn context(&self) -> Value {
        json!({
            "status": self.status,
            "email": self.email,
            "reason": self.reason,
        })
    }

    /// The function-result message recorded for this outcome.
    pub fn to_message(&self) -> Message {
        Message::function_result(FunctionName::InitiateTicketPurchase.as_str(), self.context())
    }
}
