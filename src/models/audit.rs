use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// An interview campaign. Created and edited elsewhere; this service only
/// reads audits to drive conversations and reports.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Audit {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub company_name: String,
    pub employee_count_limit: i32,
    pub description: String,
    pub system_prompt: String,
    pub instruction_prompt: String,
    pub audit_data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Audit {
    pub async fn get_by_id(pool: &PgPool, audit_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Audit>("SELECT * FROM audits WHERE id = $1")
            .bind(audit_id)
            .fetch_optional(pool)
            .await
    }
}
