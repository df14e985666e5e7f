use std::sync::Arc;

use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::broadcast::{chat_channel, ChatEvent, EventPublisher};
use crate::error::AppError;
use crate::llm::{ChatTurn, CompletionClient};
use crate::models::Role;
use crate::store::ConversationStore;

/// Drives a streaming completion for one chat: republishes every incremental
/// fragment on the chat's broadcast channel as it arrives, accumulates the
/// full text, persists the finished assistant message and announces its id.
///
/// Publishing is fire-and-forget; a subscriber that cannot keep up loses
/// events but never slows down the read loop.
pub struct StreamingRelay {
    llm: Arc<dyn CompletionClient>,
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn ConversationStore>,
}

impl StreamingRelay {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        StreamingRelay {
            llm,
            publisher,
            store,
        }
    }

    /// Returns the id of the persisted assistant message. Nothing is
    /// persisted when the provider fails mid-stream or produces no text.
    pub async fn relay(
        &self,
        chat_id: Uuid,
        history: &[ChatTurn],
        system_prompt: Option<&str>,
    ) -> Result<Uuid, AppError> {
        let channel = chat_channel(chat_id);
        self.publisher.publish(&channel, ChatEvent::started());

        let mut stream = match self.llm.stream_chat(history, system_prompt).await {
            Ok(stream) => stream,
            Err(e) => {
                self.publisher
                    .publish(&channel, ChatEvent::errored("provider request failed"));
                return Err(e);
            }
        };

        let mut accumulated = String::new();
        while let Some(fragment) = stream.next().await {
            match fragment {
                Ok(text) => {
                    // Fragments go out in arrival order, before anything else
                    // happens to them
                    self.publisher.publish(&channel, ChatEvent::chunk(text.clone()));
                    accumulated.push_str(&text);
                }
                Err(e) => {
                    self.publisher
                        .publish(&channel, ChatEvent::errored("stream aborted"));
                    return Err(e);
                }
            }
        }

        if accumulated.is_empty() {
            warn!("chat {}: stream ended with no content", chat_id);
            self.publisher.publish(
                &channel,
                ChatEvent::errored("model returned an empty completion"),
            );
            return Err(AppError::UpstreamProvider(
                "model returned an empty completion".to_string(),
            ));
        }

        let message = self
            .store
            .create_message(chat_id, Role::Assistant, &accumulated, false)
            .await?;
        self.publisher
            .publish(&channel, ChatEvent::completed(message.id));

        info!(
            "chat {}: relayed {} chars as message {}",
            chat_id,
            accumulated.len(),
            message.id
        );
        Ok(message.id)
    }
}
