//! Webhook transport boundary.
//!
//! Deliberately thin: the signature is validated against the raw body
//! before anything is parsed, invalid requests are rejected with a client
//! error and never reach business logic. Everything past this module works
//! on [`InboundMessage`] values.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::handler::MessageHandler;
use crate::traits::Gateway;
use crate::types::{InboundMessage, OwnerId};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_HEADER: &str = "x-line-signature";

pub struct WebhookState {
    pub handler: Arc<MessageHandler>,
    pub gateway: Arc<dyn Gateway>,
    pub channel_secret: String,
}

pub fn router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route("/ping", get(ping))
        .with_state(state)
}

/// Liveness check.
async fn ping() -> &'static str {
    "pong"
}

async fn callback(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !verify_signature(&state.channel_secret, &body, signature) {
        warn!("webhook signature mismatch");
        return (StatusCode::BAD_REQUEST, "invalid signature");
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "malformed webhook body");
            return (StatusCode::BAD_REQUEST, "malformed body");
        }
    };

    for event in envelope.events {
        let Some(message) = inbound_from_event(event) else {
            continue;
        };
        debug!(owner = %message.owner, "inbound message");
        let reply = state.handler.handle(&message.owner, &message.text).await;
        if let Err(e) = state.gateway.reply(&message.reply_token, &reply).await {
            warn!(error = %e, "reply delivery failed");
        }
    }

    (StatusCode::OK, "OK")
}

/// The gateway signs the raw request body: base64(HMAC-SHA256(secret, body)).
fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    expected == signature
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(default)]
    events: Vec<WebhookEvent>,
}

#[derive(Debug, Deserialize)]
struct WebhookEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "replyToken")]
    reply_token: Option<String>,
    source: Option<EventSource>,
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
struct EventSource {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "userId")]
    user_id: Option<String>,
    #[serde(rename = "groupId")]
    group_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

/// Text-message events become inbound messages; a group source makes the
/// group the owner, so the list is shared among participants. Everything
/// else (stickers, joins, ...) is ignored.
fn inbound_from_event(event: WebhookEvent) -> Option<InboundMessage> {
    if event.kind != "message" {
        return None;
    }
    let message = event.message?;
    if message.kind != "text" {
        return None;
    }
    let source = event.source?;
    let owner = match source.kind.as_str() {
        "group" => OwnerId::Group(source.group_id?),
        _ => OwnerId::User(source.user_id?),
    };
    Some(InboundMessage {
        owner,
        text: message.text?,
        reply_token: event.reply_token?,
    })
}
