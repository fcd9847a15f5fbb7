//! In-crate doubles for the three outbound seams.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tb_domain::error::{Error, Result};
use tb_domain::tool::FunctionCall;
use tb_providers::{ChatRequest, ChatResponse, LlmProvider};
use tb_ticketing::{Event, PurchaseRequest, TicketTier, TicketingBackend};
use tb_whatsapp::{EventCard, MessagingChannel};

pub fn sample_event(id: i64) -> Event {
    Event {
        id,
        title: format!("Event {id}"),
        description: String::new(),
        date: Utc.with_ymd_and_hms(2025, 12, 20, 18, 0, 0).unwrap(),
        start_time: None,
        end_time: None,
        age_restriction: None,
        venue: "Eko Hotel".into(),
        address: "Victoria Island".into(),
        poster: format!("https://cdn.example/{id}.png"),
    }
}

pub fn sample_tier() -> TicketTier {
    TicketTier {
        id: 1,
        name: "VIP".into(),
        price: 50_000.0,
        discount: false,
        discount_price: None,
        discount_expiration: None,
        number_of_discount_tickets: None,
        discount_status: None,
        benefits: Some("Backstage access".into()),
        total_number_of_tickets: 100,
        sold_out: false,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct MockBackend {
    events: Vec<Event>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn with_events(events: Vec<Event>) -> Self {
        Self {
            events,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl TicketingBackend for MockBackend {
    async fn find_events(&self, _query: &[(String, String)]) -> Result<Vec<Event>> {
        self.record("find_events".into());
        Ok(self.events.clone())
    }

    async fn nearby_events(&self, latitude: i64, longitude: i64) -> Result<Vec<Event>> {
        self.record(format!("nearby:{latitude}:{longitude}"));
        Ok(self.events.clone())
    }

    async fn trending_events(&self) -> Result<Vec<Event>> {
        self.record("trending".into());
        Ok(self.events.clone())
    }

    async fn ticket_tiers(&self, event_id: i64) -> Result<Vec<TicketTier>> {
        self.record(format!("ticket_tiers:{event_id}"));
        Ok(vec![sample_tier()])
    }

    async fn purchase(&self, event_id: i64, request: &PurchaseRequest) -> Result<String> {
        self.record(format!(
            "purchase:{event_id}:{}:{}:{}:{}",
            request.tier, request.quantity, request.email, request.whatsapp_phone_id
        ));
        Ok("https://pay.example/checkout".into())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Answers with a scripted sequence of responses, one per request.
pub struct MockLlm {
    script: Mutex<VecDeque<Result<ChatResponse>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockLlm {
    pub fn new(script: Vec<Result<ChatResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Result<ChatResponse> {
        Ok(ChatResponse {
            content: text.into(),
            model: "mock".into(),
            ..Default::default()
        })
    }

    pub fn call(call: FunctionCall) -> Result<ChatResponse> {
        Ok(ChatResponse {
            function_calls: vec![call],
            model: "mock".into(),
            ..Default::default()
        })
    }

    pub fn fail() -> Result<ChatResponse> {
        Err(Error::Provider {
            provider: "mock".into(),
            message: "503 overloaded".into(),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    async fn chat(&self, req: &ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().push(req.clone());
        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(Error::Provider {
                provider: "mock".into(),
                message: "script exhausted".into(),
            })
        })
    }

    fn provider_id(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Channel
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    MarkRead(String),
    Text {
        to: String,
        reply_to: Option<String>,
        body: String,
    },
    LocationRequest {
        to: String,
        reply_to: String,
    },
    EventCard {
        to: String,
        event_id: i64,
    },
}

#[derive(Default)]
pub struct MockChannel {
    sent: Mutex<Vec<Sent>>,
    card_times: Mutex<Vec<tokio::time::Instant>>,
    failing_cards: HashSet<i64>,
    fail_text: bool,
}

impl MockChannel {
    pub fn failing_cards(ids: &[i64]) -> Self {
        Self {
            failing_cards: ids.iter().copied().collect(),
            ..Default::default()
        }
    }

    pub fn failing_text() -> Self {
        Self {
            fail_text: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// When each event card went out, on the tokio clock.
    pub fn card_times(&self) -> Vec<tokio::time::Instant> {
        self.card_times.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessagingChannel for MockChannel {
    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.sent.lock().push(Sent::MarkRead(message_id.into()));
        Ok(())
    }

    async fn send_text(&self, to: &str, reply_to: Option<&str>, body: &str) -> Result<()> {
        if self.fail_text {
            return Err(Error::Delivery("HTTP 500".into()));
        }
        self.sent.lock().push(Sent::Text {
            to: to.into(),
            reply_to: reply_to.map(str::to_owned),
            body: body.into(),
        });
        Ok(())
    }

    async fn send_location_request(&self, to: &str, reply_to: &str) -> Result<()> {
        self.sent.lock().push(Sent::LocationRequest {
            to: to.into(),
            reply_to: reply_to.into(),
        });
        Ok(())
    }

    async fn send_event_card(&self, to: &str, card: &EventCard) -> Result<()> {
        if self.failing_cards.contains(&card.event_id) {
            return Err(Error::Delivery("HTTP 400".into()));
        }
        self.card_times.lock().push(tokio::time::Instant::now());
        self.sent.lock().push(Sent::EventCard {
            to: to.into(),
            event_id: card.event_id,
        });
        Ok(())
    }
}
