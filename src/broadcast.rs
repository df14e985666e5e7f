use anyhow::{anyhow, bail};
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use sha2::Sha256;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Events relayed to chat subscribers over the external pub/sub transport.
/// Delivery is best-effort; the relay never waits on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ChatEvent {
    MessageStart {
        status: String,
    },
    MessageChunk {
        text: String,
    },
    MessageEnd {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_uuid: Option<Uuid>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl ChatEvent {
    pub fn started() -> Self {
        ChatEvent::MessageStart {
            status: "started".to_string(),
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        ChatEvent::MessageChunk { text: text.into() }
    }

    pub fn completed(message_uuid: Uuid) -> Self {
        ChatEvent::MessageEnd {
            status: "completed".to_string(),
            message_uuid: Some(message_uuid),
            error: None,
        }
    }

    pub fn errored(reason: impl Into<String>) -> Self {
        ChatEvent::MessageEnd {
            status: "error".to_string(),
            message_uuid: None,
            error: Some(reason.into()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::MessageStart { .. } => "message-start",
            ChatEvent::MessageChunk { .. } => "message-chunk",
            ChatEvent::MessageEnd { .. } => "message-end",
        }
    }
}

/// Per-chat broadcast channel name.
pub fn chat_channel(chat_id: Uuid) -> String {
    format!("chat-{}", chat_id)
}

/// Fire-and-forget event publishing. `publish` must never block the caller;
/// implementations log and drop on backpressure.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, channel: &str, event: ChatEvent);
}

#[derive(Debug, Serialize)]
struct Envelope {
    channel: String,
    #[serde(flatten)]
    event: ChatEvent,
}

const QUEUE_CAPACITY: usize = 256;

/// Publishes events to the configured push endpoint via signed HTTP POSTs.
/// Events are queued onto a bounded channel drained by a background task, so
/// a slow endpoint can only cause dropped events, never a stalled relay.
pub struct WebhookPublisher {
    tx: mpsc::Sender<Envelope>,
}

impl WebhookPublisher {
    pub fn new(endpoint: String, secret: String) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_CAPACITY);
        let client = reqwest::Client::new();

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let event_name = envelope.event.name();
                let channel = envelope.channel.clone();
                match deliver(&client, &endpoint, &secret, &envelope).await {
                    Ok(()) => debug!("published {} to {}", event_name, channel),
                    Err(e) => warn!("failed to publish {} to {}: {}", event_name, channel, e),
                }
            }
        });

        WebhookPublisher { tx }
    }
}

impl EventPublisher for WebhookPublisher {
    fn publish(&self, channel: &str, event: ChatEvent) {
        let envelope = Envelope {
            channel: channel.to_string(),
            event,
        };
        if let Err(e) = self.tx.try_send(envelope) {
            warn!("event queue full or closed, dropping event: {}", e);
        }
    }
}

async fn deliver(
    client: &reqwest::Client,
    endpoint: &str,
    secret: &str,
    envelope: &Envelope,
) -> Result<(), anyhow::Error> {
    let body = serde_json::to_vec(envelope)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("invalid push secret: {}", e))?;
    mac.update(&body);
    let signature = hex::encode(mac.finalize().into_bytes());

    let response = client
        .post(endpoint)
        .header(CONTENT_TYPE, "application/json")
        .header("X-Push-Signature", signature)
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        bail!("push endpoint returned {}", response.status());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_channel_name_embeds_the_chat_id() {
        let chat_id = Uuid::new_v4();
        assert_eq!(chat_channel(chat_id), format!("chat-{}", chat_id));
    }

    #[test]
    fn events_serialize_with_kebab_case_names() {
        let start = serde_json::to_value(ChatEvent::started()).unwrap();
        assert_eq!(start["event"], "message-start");
        assert_eq!(start["status"], "started");

        let chunk = serde_json::to_value(ChatEvent::chunk("ahoj")).unwrap();
        assert_eq!(chunk["event"], "message-chunk");
        assert_eq!(chunk["text"], "ahoj");
    }

    #[test]
    fn end_event_omits_absent_fields() {
        let id = Uuid::new_v4();
        let completed = serde_json::to_value(ChatEvent::completed(id)).unwrap();
        assert_eq!(completed["status"], "completed");
        assert_eq!(completed["message_uuid"], id.to_string());
        assert!(completed.get("error").is_none());

        let errored = serde_json::to_value(ChatEvent::errored("empty completion")).unwrap();
        assert_eq!(errored["status"], "error");
        assert_eq!(errored["error"], "empty completion");
        assert!(errored.get("message_uuid").is_none());
    }
}
