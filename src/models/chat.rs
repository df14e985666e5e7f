use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "chat_state_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum ChatState {
    Open,
    Finished,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Chat {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub state: ChatState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Chat {
    fn default() -> Self {
        Chat {
            id: Uuid::new_v4(),
            audit_id: Uuid::nil(),
            state: ChatState::Open,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl Chat {
    pub async fn get_by_id(pool: &PgPool, chat_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(pool: &PgPool, audit_id: Uuid) -> Result<Self, sqlx::Error> {
        let chat = Chat {
            audit_id,
            ..Default::default()
        };
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            INSERT INTO chats (id, audit_id, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(chat.id)
        .bind(chat.audit_id)
        .bind(chat.state)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_one(pool)
        .await?;

        debug!("Chat created: {:?}", chat);
        Ok(chat)
    }

    /// Moves the chat into a new lifecycle state and bumps `updated_at`.
    pub async fn set_state(
        pool: &PgPool,
        chat_id: Uuid,
        state: ChatState,
    ) -> Result<Self, sqlx::Error> {
        let chat = sqlx::query_as::<_, Chat>(
            r#"
            UPDATE chats
            SET state = $1, updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(state)
        .bind(Utc::now())
        .bind(chat_id)
        .fetch_one(pool)
        .await?;

        debug!("Chat updated: {:?}", chat);
        Ok(chat)
    }
}
