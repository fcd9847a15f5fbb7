//! Messaging webhook: subscription verification and inbound messages.
//!
//! - `GET  /messages/webhook`: echo `hub.challenge` when the verify token matches
//! - `POST /messages/webhook`: accept a delivery and process its first message
//!
//! Inbound deliveries are acknowledged with 200 as soon as the body parses.
//! Each message id is handled at most once; redeliveries are acknowledged and
//! dropped.  The turn itself runs in a background task; its failures are
//! logged, never surfaced to the platform (which would only redeliver).

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tb_whatsapp::inbound::WebhookTarget;
use tb_whatsapp::WebhookRequest;
use tracing::Instrument;

use crate::runtime::turn::InboundTurn;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    challenge: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GET /messages/webhook
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn verify(State(state): State<AppState>, Query(params): Query<VerifyParams>) -> Response {
    let subscribed = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(state.secrets.verify_token.as_str());

    if subscribed && token_ok {
        tracing::info!("webhook verified");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        tracing::warn!(mode = ?params.mode, "webhook verification failed");
        (StatusCode::FORBIDDEN, "Verification failed: Invalid token").into_response()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /messages/webhook
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn inbound(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let request: WebhookRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "malformed webhook payload");
            return StatusCode::BAD_REQUEST;
        }
    };

    let message = match request.route(&state.secrets.business_account_id) {
        WebhookTarget::NoEntry => return StatusCode::OK,
        WebhookTarget::ForeignAccount(id) => {
            tracing::warn!(account_id = %id, "webhook for another business account ignored");
            return StatusCode::OK;
        }
        WebhookTarget::NoMessages => return StatusCode::OK,
        WebhookTarget::Message(m) => m,
    };

    let Some(content) = message.content() else {
        tracing::info!(kind = %message.kind, "unsupported message type ignored");
        return StatusCode::OK;
    };

    match state.dedupe.claim(&message.id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(message_id = %message.id, "duplicate delivery ignored");
            return StatusCode::OK;
        }
        // Losing the record risks a repeat turn; dropping the message loses it.
        Err(e) => tracing::warn!(error = %e, message_id = %message.id, "inbound dedupe unavailable"),
    }

    let turn = InboundTurn {
        user_id: message.from.clone(),
        message_id: message.id.clone(),
        content,
    };
    let span = tracing::info_span!(
        "turn",
        message_id = %turn.message_id,
        user_key = %tb_sessions::user_key(&turn.user_id),
    );
    let turns = state.turns.clone();
    tokio::spawn(
        async move {
            if let Err(e) = turns.process(turn).await {
                tracing::error!(error = %e, "turn failed");
            }
        }
        .instrument(span),
    );

    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_support::{app, ACCOUNT_ID, VERIFY_TOKEN};
    use crate::runtime::testing::{MockLlm, Sent};
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn text_delivery(account: &str) -> String {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": account,
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": "2348000000001",
                            "id": "wamid.abc",
                            "timestamp": "1735689600",
                            "type": "text",
                            "text": { "body": "hello" }
                        }]
                    }
                }]
            }]
        })
        .to_string()
    }

    fn post(body: impl Into<Body>) -> Request<Body> {
        Request::post("/messages/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn verification_echoes_challenge() {
        let t = app(vec![]);
        let uri = format!(
            "/messages/webhook?hub.mode=subscribe&hub.verify_token={VERIFY_TOKEN}&hub.challenge=1158201444"
        );
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"1158201444");
    }

    #[tokio::test]
    async fn verification_rejects_wrong_token() {
        let t = app(vec![]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(
                Request::get("/messages/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let t = app(vec![]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(post("{not json"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn foreign_account_is_acknowledged_and_ignored() {
        let t = app(vec![MockLlm::text("should not be used")]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(post(text_delivery("someone-else")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(t.llm.requests().is_empty());
        assert!(t.channel.sent().is_empty());
    }

    #[tokio::test]
    async fn text_message_is_answered_in_background() {
        let t = app(vec![MockLlm::text("Hey! Looking for something fun this weekend?")]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(post(text_delivery(ACCOUNT_ID)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        tokio::time::timeout(Duration::from_secs(5), async {
            while t.channel.texts().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            t.channel.sent()[1],
            Sent::Text {
                to: "2348000000001".into(),
                reply_to: Some("wamid.abc".into()),
                body: "Hey! Looking for something fun this weekend?".into(),
            }
        );
    }

    #[tokio::test]
    async fn redelivered_message_runs_one_turn() {
        let t = app(vec![MockLlm::text("first reply"), MockLlm::text("second reply")]);
        for _ in 0..2 {
            let resp = router()
                .with_state(t.state.clone())
                .oneshot(post(text_delivery(ACCOUNT_ID)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }

        tokio::time::timeout(Duration::from_secs(5), async {
            while t.channel.texts().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(t.llm.requests().len(), 1);
        assert_eq!(t.channel.texts(), vec!["first reply".to_owned()]);
        let history = t.state.history.read("2348000000001").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn delivery_without_messages_is_acknowledged() {
        let t = app(vec![]);
        let body = serde_json::json!({
            "entry": [{ "id": ACCOUNT_ID, "changes": [{ "field": "messages", "value": { "statuses": [] } }] }]
        });
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(post(body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
