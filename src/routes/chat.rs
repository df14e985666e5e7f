use actix_web::{get, post, put, web};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::ChatTurn;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{Chat, ChatState, Message, Role};
use crate::store::{ConversationStore, ReportStore};
use crate::types::{SendMessageRequest, SendMessageResponse};
use crate::AppState;

#[post("/audits/{audit_id}/chats")]
pub async fn create_chat(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    audit_id: web::Path<Uuid>,
) -> Result<web::Json<Chat>, AppError> {
    let audit_id = audit_id.into_inner();
    app_state
        .store
        .audit_by_id(audit_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("audit {}", audit_id)))?;

    let chat = app_state.store.create_chat(audit_id).await?;
    Ok(web::Json(chat))
}

#[get("/chats/{chat_id}/messages")]
pub async fn get_messages(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<web::Json<Vec<Message>>, AppError> {
    let chat_id = chat_id.into_inner();
    app_state
        .store
        .chat_by_id(chat_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;

    let messages = app_state.store.visible_history(chat_id).await?;
    Ok(web::Json(messages))
}

/// Accepts a participant message and relays the streaming assistant reply.
/// Responds once the stream finished, with the persisted assistant message
/// id; the incremental text goes out on the chat's broadcast channel.
#[post("/chats/{chat_id}/messages")]
pub async fn send_message(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
    body: web::Json<SendMessageRequest>,
) -> Result<web::Json<SendMessageResponse>, AppError> {
    let chat_id = chat_id.into_inner();
    let content = body.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("message content is required".to_string()));
    }

    let chat = app_state
        .store
        .chat_by_id(chat_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;
    let audit = app_state
        .store
        .audit_by_id(chat.audit_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("audit {}", chat.audit_id)))?;

    app_state
        .store
        .create_message(chat.id, Role::User, content, false)
        .await?;

    let history: Vec<ChatTurn> = app_state
        .store
        .visible_history(chat.id)
        .await?
        .into_iter()
        .map(|m| ChatTurn {
            role: m.role,
            content: m.content,
        })
        .collect();

    let system_prompt = (!audit.system_prompt.is_empty()).then_some(audit.system_prompt.as_str());
    let message_uuid = app_state
        .relay
        .relay(chat.id, &history, system_prompt)
        .await?;

    Ok(web::Json(SendMessageResponse { message_uuid }))
}

#[put("/chats/{chat_id}/finish")]
pub async fn finish_chat(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<web::Json<Chat>, AppError> {
    let chat_id = chat_id.into_inner();
    app_state
        .store
        .chat_by_id(chat_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("chat {}", chat_id)))?;

    let chat = Chat::set_state(&app_state.pool, chat_id, ChatState::Finished).await?;
    Ok(web::Json(chat))
}
