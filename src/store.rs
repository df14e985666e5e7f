use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::report::{replace_report_tree, ReportTree};
use crate::models::{Analysis, Audit, Chat, Message, NewAnalysis, Role};

/// Per-chat activity summary consumed by the pending-work selector. Rows are
/// restricted to open chats with at least one visible user message.
#[derive(Debug, Clone, FromRow)]
pub struct ChatActivity {
    pub chat_id: Uuid,
    pub last_message_at: DateTime<Utc>,
    pub last_analysis_at: Option<DateTime<Utc>>,
}

/// Persistence seam for chats, messages and analyses.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError>;
    async fn create_chat(&self, audit_id: Uuid) -> Result<Chat, AppError>;
    async fn create_message(
        &self,
        chat_id: Uuid,
        role: Role,
        content: &str,
        hidden: bool,
    ) -> Result<Message, AppError>;
    async fn visible_history(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError>;
    async fn insert_analysis(&self, new: &NewAnalysis) -> Result<Analysis, AppError>;
    async fn open_chat_activity(&self) -> Result<Vec<ChatActivity>, AppError>;
}

/// Persistence seam for audits and their synthesized report trees.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn audit_by_id(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError>;
    async fn analyses_with_tags(&self, audit_id: Uuid) -> Result<Vec<Analysis>, AppError>;
    /// Replaces the audit's whole report tree, all-or-nothing.
    async fn replace_report(&self, audit_id: Uuid, tree: &ReportTree) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }
}

#[async_trait]
impl ConversationStore for PgStore {
    async fn chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, AppError> {
        Ok(Chat::get_by_id(&self.pool, chat_id).await?)
    }

    async fn create_chat(&self, audit_id: Uuid) -> Result<Chat, AppError> {
        Ok(Chat::create(&self.pool, audit_id).await?)
    }

    async fn create_message(
        &self,
        chat_id: Uuid,
        role: Role,
        content: &str,
        hidden: bool,
    ) -> Result<Message, AppError> {
        Ok(Message::create(&self.pool, chat_id, role, content, hidden).await?)
    }

    async fn visible_history(&self, chat_id: Uuid) -> Result<Vec<Message>, AppError> {
        Ok(Message::visible_history(&self.pool, chat_id).await?)
    }

    async fn insert_analysis(&self, new: &NewAnalysis) -> Result<Analysis, AppError> {
        Ok(Analysis::insert(&self.pool, new).await?)
    }

    async fn open_chat_activity(&self) -> Result<Vec<ChatActivity>, AppError> {
        let rows = sqlx::query_as::<_, ChatActivity>(
            r#"
            SELECT c.id AS chat_id,
                   MAX(m.created_at) AS last_message_at,
                   MAX(a.created_at) AS last_analysis_at
            FROM chats c
            JOIN messages m ON m.chat_id = c.id AND m.hidden = false
            LEFT JOIN analyses a ON a.chat_id = c.id
            WHERE c.state = 'open'
              AND EXISTS (
                  SELECT 1 FROM messages um
                  WHERE um.chat_id = c.id AND um.hidden = false AND um.role = 'user'
              )
            GROUP BY c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ReportStore for PgStore {
    async fn audit_by_id(&self, audit_id: Uuid) -> Result<Option<Audit>, AppError> {
        Ok(Audit::get_by_id(&self.pool, audit_id).await?)
    }

    async fn analyses_with_tags(&self, audit_id: Uuid) -> Result<Vec<Analysis>, AppError> {
        Ok(Analysis::tagged_for_audit(&self.pool, audit_id).await?)
    }

    async fn replace_report(&self, audit_id: Uuid, tree: &ReportTree) -> Result<(), AppError> {
        Ok(replace_report_tree(&self.pool, audit_id, tree).await?)
    }
}
