//! REST implementation of [`TicketingBackend`].
//!
//! `HttpTicketingBackend` wraps a `reqwest::Client` with the configured
//! timeout and a bearer credential, and translates each trait method into
//! one HTTP call.  There is no retry: the caller decides what a failed
//! lookup means for the conversation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use tb_domain::config::BackendConfig;
use tb_domain::error::{Error, Result};
use tb_domain::trace::TraceEvent;
use uuid::Uuid;

use crate::backend::TicketingBackend;
use crate::types::{ApiEnvelope, Event, PurchaseRequest, TicketTier};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct HttpTicketingBackend {
    http: Client,
    base_url: String,
    api_key: String,
}

impl HttpTicketingBackend {
    /// Build a client from the `[backend]` config section and the resolved
    /// bearer token.
    pub fn new(cfg: &BackendConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url: cfg.api_url(),
            api_key,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Build the full URL for a path like `/events/trending`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .bearer_auth(&self.api_key)
            .header("X-Request-Id", Uuid::new_v4().to_string())
    }

    /// Send a request and decode the response envelope.
    ///
    /// A non-2xx status and an undecodable body both surface as
    /// [`Error::BackendRequestFailed`]; the backend's `message`, when it can
    /// be read, is carried along for the logs.
    async fn send(&self, endpoint: &str, rb: RequestBuilder) -> Result<ApiEnvelope> {
        let start = Instant::now();
        let resp = rb.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{endpoint}: {e}"))
            } else {
                Error::Http(format!("{endpoint}: {e}"))
            }
        })?;

        let status = resp.status();
        TraceEvent::BackendCall {
            endpoint: endpoint.to_owned(),
            status: status.as_u16(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();

        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        let decoded = serde_json::from_str::<ApiEnvelope>(&body);

        if !status.is_success() {
            let message = decoded
                .ok()
                .and_then(|env| env.message)
                .unwrap_or_else(|| truncate(&body, 200));
            tracing::error!(
                endpoint,
                status = status.as_u16(),
                error_msg = %message,
                "backend request failed"
            );
            return Err(Error::BackendRequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        decoded.map_err(|e| {
            tracing::error!(endpoint, error = %e, "invalid backend response payload");
            Error::BackendRequestFailed {
                status: status.as_u16(),
                message: format!("invalid response payload: {e}"),
            }
        })
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl TicketingBackend for HttpTicketingBackend {
    async fn find_events(&self, query: &[(String, String)]) -> Result<Vec<Event>> {
        let rb = self.request(Method::GET, "/events").query(query);
        let env = self.send("events", rb).await?;
        Ok(env.events.unwrap_or_default())
    }

    async fn nearby_events(&self, latitude: i64, longitude: i64) -> Result<Vec<Event>> {
        let rb = self
            .request(Method::GET, "/events/nearby")
            .query(&[("latitude", latitude), ("longitude", longitude)]);
        let env = self.send("events/nearby", rb).await?;
        Ok(env.events.unwrap_or_default())
    }

    async fn trending_events(&self) -> Result<Vec<Event>> {
        let rb = self.request(Method::GET, "/events/trending");
        let env = self.send("events/trending", rb).await?;
        Ok(env.events.unwrap_or_default())
    }

    async fn ticket_tiers(&self, event_id: i64) -> Result<Vec<TicketTier>> {
        let rb = self.request(Method::GET, &format!("/events/{event_id}/tickets"));
        let env = self.send("events/tickets", rb).await?;
        Ok(env.tickets.unwrap_or_default())
    }

    async fn purchase(&self, event_id: i64, request: &PurchaseRequest) -> Result<String> {
        let rb = self
            .request(Method::POST, &format!("/events/{event_id}/tickets/purchase"))
            .json(request);
        let env = self.send("events/tickets/purchase", rb).await?;
        env.checkout
            .filter(|link| !link.is_empty())
            .ok_or_else(|| Error::BackendRequestFailed {
                status: 200,
                message: "response carried no checkout link".into(),
            })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
