use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct SendMessageResponse {
    pub message_uuid: Uuid,
}

#[derive(Serialize)]
pub struct NextAnalysisResponse {
    /// The chat analyzed by this tick, if any work was pending.
    pub chat_id: Option<Uuid>,
}
