//! Payment reconciliation: fold a payment outcome into the buyer's
//! conversation and tell them about it.

use std::sync::Arc;

use async_trait::async_trait;
use tb_domain::conversation::{ConversationState, Turn};
use tb_domain::error::Result;
use tb_domain::payment::PaymentNotification;
use tb_domain::tool::Message;
use tb_providers::{LlmProvider, ModelOutput};
use tb_sessions::{ConversationStore, IdempotencyGuard};
use tb_whatsapp::MessagingChannel;

use super::chat_request;
use super::session_lock::SessionLockMap;

/// Sent when the model cannot phrase the follow-up.
pub const PAYMENT_FALLBACK: &str = "Your payment is being processed.";

/// Work executed by the payment queue for each job.
#[async_trait]
pub trait PaymentHandler: Send + Sync {
    /// Process one notification.  An `Err` makes the job eligible for
    /// retry.
    async fn handle(&self, notification: &PaymentNotification) -> Result<()>;
}

pub struct PaymentReconciler {
    llm: Arc<dyn LlmProvider>,
    channel: Arc<dyn MessagingChannel>,
    history: Arc<ConversationStore>,
    idempotency: Arc<IdempotencyGuard>,
    gate: Option<Arc<SessionLockMap>>,
    temperature: Option<f32>,
}

impl PaymentReconciler {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        channel: Arc<dyn MessagingChannel>,
        history: Arc<ConversationStore>,
        idempotency: Arc<IdempotencyGuard>,
    ) -> Self {
        Self {
            llm,
            channel,
            history,
            idempotency,
            gate: None,
            temperature: None,
        }
    }

    pub fn with_gate(mut self, gate: Arc<SessionLockMap>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn follow_up(&self, user_id: &str) -> Result<String> {
        let messages: Vec<Message> = self
            .history
            .read(user_id)
            .await?
            .into_iter()
            .map(|t| t.message)
            .collect();

        let text = match self.llm.chat(&chat_request(messages, self.temperature)).await {
            Ok(resp) => match resp.output() {
                Some(ModelOutput::Text(text)) => text,
                other => {
                    tracing::warn!(output = ?other, "payment follow-up was not text");
                    PAYMENT_FALLBACK.to_owned()
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "payment follow-up generation failed");
                PAYMENT_FALLBACK.to_owned()
            }
        };
        Ok(text)
    }
}

#[async_trait]
impl PaymentHandler for PaymentReconciler {
    async fn handle(&self, n: &PaymentNotification) -> Result<()> {
        let _permit = match &self.gate {
            Some(gate) => Some(gate.acquire(&n.phone_id).await?),
            None => None,
        };

        // A retry after a successful earlier attempt, or a duplicate that
        // slipped through admission.
        if self.idempotency.exists(&n.reference) {
            tracing::info!(reference = %n.reference, "payment already reconciled");
            return Ok(());
        }

        self.history
            .append(
                &n.phone_id,
                vec![Turn::new(n.to_message(), ConversationState::Completed)],
            )
            .await?;

        let text = self.follow_up(&n.phone_id).await?;
        self.channel.send_text(&n.phone_id, None, &text).await?;

        self.history
            .append(
                &n.phone_id,
                vec![Turn::new(Message::model(text), ConversationState::Completed)],
            )
            .await?;
        self.idempotency.mark_processed(&n.reference).await?;

        tracing::info!(reference = %n.reference, status = ?n.status, "payment reconciled");
        Ok(())
    }
}
