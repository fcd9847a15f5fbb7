//! Payment callback from the ticketing backend.
//!
//! The backend signs the JSON-quoted payment reference (`"\"<reference>\""`)
//! with HMAC-SHA256 keyed by its API key and sends the hex digest in the
//! signature header.  Verified, non-duplicate notifications are queued for
//! reconciliation.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tb_domain::payment::PaymentNotification;
use tb_domain::trace::TraceEvent;

use super::api_error;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of the JSON-encoded `reference`.
pub fn sign_reference(key: &[u8], reference: &str) -> Option<String> {
    let quoted = serde_json::to_string(reference).ok()?;
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(quoted.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// `POST /payments/callback`
pub async fn callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let notification: PaymentNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "malformed payment notification");
            return api_error(StatusCode::BAD_REQUEST, "malformed payment notification");
        }
    };

    // 1. Signature.
    let header = &state.config.payments.signature_header;
    let Some(received) = headers.get(header.as_str()).and_then(|v| v.to_str().ok()) else {
        tracing::warn!("payment notification missing signature header");
        return api_error(StatusCode::UNAUTHORIZED, "missing signature");
    };
    let Some(expected) = sign_reference(&state.secrets.signing_key, &notification.reference)
    else {
        tracing::error!("failed to compute payment signature");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "signature check failed");
    };
    // Constant-time comparison to prevent timing attacks.
    if expected.as_bytes().ct_eq(received.as_bytes()).unwrap_u8() != 1 {
        tracing::warn!(reference = %notification.reference, "payment notification signature mismatch");
        return api_error(StatusCode::UNAUTHORIZED, "invalid signature");
    }

    // 2. Idempotency.  Check-then-enqueue: two copies racing past this check
    // are both queued and the reconciler skips the second.
    let duplicate = state.idempotency.exists(&notification.reference);
    TraceEvent::PaymentAdmitted {
        reference: notification.reference.clone(),
        duplicate,
    }
    .emit();
    if duplicate {
        tracing::warn!(reference = %notification.reference, "duplicate payment notification");
        return (StatusCode::OK, "Duplicate notification").into_response();
    }

    // 3. Queue.
    match state.payments.enqueue(notification).await {
        Ok(job_id) => {
            tracing::info!(%job_id, "payment notification queued");
            (StatusCode::OK, "Payment notification processed").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to queue payment notification");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to queue notification")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router;
    use crate::api::test_support::{app, SIGNING_KEY};
    use crate::runtime::testing::MockLlm;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    const BODY: &str = r#"{"reference":"ref-77","status":"success","phoneId":"2348000000001","email":"ada@example.com"}"#;

    fn request(signature: Option<&str>, body: &str) -> Request<Body> {
        let mut req = Request::post("/payments/callback").header("content-type", "application/json");
        if let Some(sig) = signature {
            req = req.header("x-webhook-signature", sig);
        }
        req.body(Body::from(body.to_owned())).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn signature_covers_the_quoted_reference() {
        let mut mac = HmacSha256::new_from_slice(b"k").unwrap();
        mac.update(b"\"ref-1\"");
        let manual = hex::encode(mac.finalize().into_bytes());
        assert_eq!(sign_reference(b"k", "ref-1").unwrap(), manual);
    }

    #[tokio::test]
    async fn missing_or_wrong_signature_is_unauthorized() {
        let t = app(vec![]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(request(None, BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = router()
            .with_state(t.state.clone())
            .oneshot(request(Some("deadbeef"), BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let t = app(vec![]);
        let resp = router()
            .with_state(t.state.clone())
            .oneshot(request(Some("x"), r#"{"reference": 5}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_is_acknowledged_without_queueing() {
        let t = app(vec![]);
        t.state.idempotency.mark_processed("ref-77").await.unwrap();
        let sig = sign_reference(SIGNING_KEY.as_bytes(), "ref-77").unwrap();

        let resp = router()
            .with_state(t.state.clone())
            .oneshot(request(Some(&sig), BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "Duplicate notification");
        assert_eq!(t.state.payments.pending(), 0);
    }

    #[tokio::test]
    async fn valid_notification_is_queued_and_reconciled() {
        let t = app(vec![MockLlm::text("Payment confirmed! Your tickets are on the way.")]);
        let sig = sign_reference(SIGNING_KEY.as_bytes(), "ref-77").unwrap();

        let resp = router()
            .with_state(t.state.clone())
            .oneshot(request(Some(&sig), BODY))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "Payment notification processed");

        tokio::time::timeout(Duration::from_secs(5), async {
            while !t.state.idempotency.exists("ref-77") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            t.channel.texts(),
            vec!["Payment confirmed! Your tickets are on the way.".to_owned()]
        );
    }
}
