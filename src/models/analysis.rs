use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::debug;
use uuid::Uuid;

/// One AI assessment of a chat transcript. Rows are append-only; a chat
/// accumulates one row per analysis run and "last analysis" is the newest
/// `created_at`. A row with every metric field NULL is a failed-parse marker
/// and still counts as analyzed for scheduling.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Analysis {
    pub id: i64,
    pub chat_id: Uuid,
    pub sentiment: Option<i32>,
    pub summary: Option<String>,
    pub key_findings: Option<String>,
    pub tags: Option<String>,
    pub topics: Option<String>,
    pub customer_satisfaction: Option<i32>,
    pub agent_effectiveness: Option<i32>,
    pub improvement_suggestions: Option<String>,
    pub conversation_quality: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for an Analysis row. All-None is the failed-parse marker.
#[derive(Debug, Clone, Default)]
pub struct NewAnalysis {
    pub chat_id: Uuid,
    pub sentiment: Option<i32>,
    pub summary: Option<String>,
    pub key_findings: Option<String>,
    pub tags: Option<String>,
    pub topics: Option<String>,
    pub customer_satisfaction: Option<i32>,
    pub agent_effectiveness: Option<i32>,
    pub improvement_suggestions: Option<String>,
    pub conversation_quality: Option<String>,
}

impl Analysis {
    pub async fn insert(pool: &PgPool, new: &NewAnalysis) -> Result<Self, sqlx::Error> {
        let analysis = sqlx::query_as::<_, Analysis>(
            r#"
            INSERT INTO analyses (chat_id, sentiment, summary, key_findings, tags, topics,
                customer_satisfaction, agent_effectiveness, improvement_suggestions,
                conversation_quality, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(new.chat_id)
        .bind(new.sentiment)
        .bind(&new.summary)
        .bind(&new.key_findings)
        .bind(&new.tags)
        .bind(&new.topics)
        .bind(new.customer_satisfaction)
        .bind(new.agent_effectiveness)
        .bind(&new.improvement_suggestions)
        .bind(&new.conversation_quality)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        debug!("Analysis added: chat={} id={}", analysis.chat_id, analysis.id);
        Ok(analysis)
    }

    /// Every tagged analysis for chats under an audit, oldest first. These are
    /// the rows report synthesis aggregates over.
    pub async fn tagged_for_audit(pool: &PgPool, audit_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Analysis>(
            r#"
            SELECT a.* FROM analyses a
            JOIN chats c ON c.id = a.chat_id
            WHERE c.audit_id = $1 AND a.tags IS NOT NULL
            ORDER BY a.created_at ASC
            "#,
        )
        .bind(audit_id)
        .fetch_all(pool)
        .await
    }
}
