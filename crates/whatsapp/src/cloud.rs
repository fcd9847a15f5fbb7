//! [`MessagingChannel`] over the WhatsApp Cloud API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use serde::Serialize;
use tb_domain::config::WhatsAppConfig;
use tb_domain::error::{Error, Result};
use tb_domain::trace::TraceEvent;

use crate::channel::{EventCard, MessagingChannel};
use crate::format::{event_card_body, select_button_id};
use crate::outbound::{Interactive, OutboundMessage, ReadReceipt};

pub struct CloudApiChannel {
    http: Client,
    messages_url: String,
    access_token: String,
    tz: Tz,
}

impl CloudApiChannel {
    /// `messages_url` is the phone number's full `/messages` endpoint.
    pub fn new(cfg: &WhatsAppConfig, messages_url: String, access_token: String) -> Result<Self> {
        let tz: Tz = cfg
            .timezone
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone '{}'", cfg.timezone)))?;
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            messages_url,
            access_token,
            tz,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) -> Result<()> {
        let start = Instant::now();
        let result = self.post_inner(payload).await;
        TraceEvent::ChannelSend {
            kind: kind.to_owned(),
            ok: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        if let Err(ref e) = result {
            tracing::warn!(kind, error = %e, "whatsapp send failed");
        }
        result
    }

    async fn post_inner<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let resp = self
            .http
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(e.to_string())
                } else {
                    Error::Delivery(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(300).collect();
            return Err(Error::Delivery(format!("HTTP {status}: {snippet}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingChannel for CloudApiChannel {
    async fn mark_read(&self, message_id: &str) -> Result<()> {
        self.post("mark_read", &ReadReceipt::new(message_id)).await
    }

    async fn send_text(&self, to: &str, reply_to: Option<&str>, body: &str) -> Result<()> {
        self.post("text", &OutboundMessage::text(to, reply_to, body))
            .await
    }

    async fn send_location_request(&self, to: &str, reply_to: &str) -> Result<()> {
        let msg = OutboundMessage::interactive(to, Some(reply_to), Interactive::location_request());
        self.post("location_request", &msg).await
    }

    async fn send_event_card(&self, to: &str, card: &EventCard) -> Result<()> {
        let interactive = Interactive::select_card(
            &card.poster,
            event_card_body(&card.title, card.date, self.tz),
            select_button_id(card.event_id),
        );
        let msg = OutboundMessage::interactive(to, None, interactive);
        self.post("event_card", &msg).await
    }
}
