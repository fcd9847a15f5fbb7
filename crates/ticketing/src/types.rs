use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An upcoming event as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_restriction: Option<i32>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub address: String,
    /// Poster image URL.
    #[serde(default)]
    pub poster: String,
}

/// One purchasable tier of an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketTier {
    pub id: i64,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub discount: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_expiration: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_discount_tickets: Option<i64>,
    /// `ACTIVE` or `ENDED`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<String>,
    #[serde(default)]
    pub total_number_of_tickets: i64,
    #[serde(default)]
    pub sold_out: bool,
}

/// Every backend response uses this envelope; which field is populated
/// depends on the endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub events: Option<Vec<Event>>,
    #[serde(default)]
    pub tickets: Option<Vec<TicketTier>>,
    #[serde(default)]
    pub checkout: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /events/{id}/tickets/purchase`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub tier: String,
    pub quantity: i64,
    pub email: String,
    pub whatsapp_phone_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_decodes_backend_shape() {
        let raw = r#"{
            "id": 7, "title": "Devfest Lagos", "description": "GDG",
            "date": "2025-11-29T00:00:00Z",
            "startTime": "2025-11-29T09:00:00Z", "endTime": "2025-11-29T17:00:00Z",
            "venue": "Landmark Centre", "address": "Oniru", "poster": "https://cdn/p.png"
        }"#;
        let e: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(e.id, 7);
        assert!(e.age_restriction.is_none());
        assert_eq!(e.poster, "https://cdn/p.png");
    }

    #[test]
    fn tier_decodes_optional_discount_fields() {
        let raw = r#"{"id": 1, "name": "VIP", "price": 50000, "discount": true,
                      "discountPrice": 40000, "discountStatus": "ACTIVE",
                      "totalNumberOfTickets": 100, "soldOut": false}"#;
        let t: TicketTier = serde_json::from_str(raw).unwrap();
        assert_eq!(t.discount_price, Some(40000.0));
        assert_eq!(t.discount_status.as_deref(), Some("ACTIVE"));
        assert!(t.benefits.is_none());
    }

    #[test]
    fn purchase_request_uses_backend_field_names() {
        let body = serde_json::to_value(PurchaseRequest {
            tier: "VIP".into(),
            quantity: 2,
            email: "a@b.co".into(),
            whatsapp_phone_id: "234800".into(),
        })
        .unwrap();
        assert_eq!(body["whatsappPhoneId"], "234800");
        assert_eq!(body["quantity"], 2);
    }

    #[test]
    fn envelope_tolerates_nulls_and_missing_fields() {
        let env: ApiEnvelope = serde_json::from_str(r#"{"events": null, "message": "ok"}"#).unwrap();
        assert!(env.events.is_none());
        assert!(env.tickets.is_none());
        assert_eq!(env.message.as_deref(), Some("ok"));
    }
}
