use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "role_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum Role {
    Assistant,
    User,
}

/// One turn of a chat. Immutable once written; ordering within a chat is by
/// `created_at`. Hidden messages are excluded from model context and analysis.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub content: String,
    pub role: Role,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}

impl Default for Message {
    fn default() -> Self {
        Message {
            id: Uuid::new_v4(),
            chat_id: Uuid::nil(),
            content: String::new(),
            role: Role::User,
            hidden: false,
            created_at: Utc::now(),
        }
    }
}

impl Message {
    pub async fn create(
        pool: &PgPool,
        chat_id: Uuid,
        role: Role,
        content: &str,
        hidden: bool,
    ) -> Result<Self, sqlx::Error> {
        let message = Message {
            chat_id,
            content: content.to_string(),
            role,
            hidden,
            ..Default::default()
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, content, role, hidden, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(&message.content)
        .bind(message.role)
        .bind(message.hidden)
        .bind(message.created_at)
        .execute(pool)
        .await?;

        Ok(message)
    }

    /// All non-hidden messages of a chat, oldest first.
    pub async fn visible_history(pool: &PgPool, chat_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE chat_id = $1 AND hidden = false
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(pool)
        .await
    }
}
