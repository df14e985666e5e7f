use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Type};
use tracing::info;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "severity_enum", rename_all = "lowercase")] // SQL value name
#[serde(rename_all = "lowercase")] // JSON value name
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Normalizes a model-supplied severity string. Anything outside the
    /// three known values becomes `Medium` so a single sloppy field does not
    /// sink a whole topic.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "low" => Severity::Low,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            other => {
                tracing::warn!("unknown severity '{}', defaulting to medium", other);
                Severity::Medium
            }
        }
    }
}

/// One section of a synthesized report: the home/executive-summary slide
/// (order 0) or a topic slide (order 1..N).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditSlide {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub order_index: i32,
    pub name: String,
    pub description: String,
    pub is_home: bool,
    pub content_html: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditFinding {
    pub id: Uuid,
    pub slide_id: Uuid,
    pub order_index: i32,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub severity: Severity,
}

/// Links a finding back to a conversation that evidenced it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditFindingExample {
    pub id: Uuid,
    pub finding_id: Uuid,
    pub chat_id: Uuid,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AuditTagCloud {
    pub id: Uuid,
    pub audit_id: Uuid,
    pub tag: String,
    pub weight: i32,
}

/// Fully assembled report tree, built in memory by synthesis and committed in
/// one transaction. Slide order in `slides` is the persisted order.
#[derive(Debug, Clone, Default)]
pub struct ReportTree {
    pub slides: Vec<SlideSpec>,
    pub tags: Vec<TagSpec>,
}

#[derive(Debug, Clone)]
pub struct SlideSpec {
    pub name: String,
    pub description: String,
    pub is_home: bool,
    pub content_html: Option<String>,
    pub findings: Vec<FindingSpec>,
}

#[derive(Debug, Clone)]
pub struct FindingSpec {
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub severity: Severity,
    pub example_chat_ids: Vec<Uuid>,
}

#[derive(Debug, Clone)]
pub struct TagSpec {
    pub tag: String,
    pub weight: i32,
}

/// Replaces the whole report tree for an audit: deletes existing slides
/// (findings and examples cascade) and tag-cloud rows, then inserts the new
/// tree. One transaction; readers never see a half-written report.
pub async fn replace_report_tree(
    pool: &PgPool,
    audit_id: Uuid,
    tree: &ReportTree,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM audit_slides WHERE audit_id = $1")
        .bind(audit_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM audit_tag_cloud WHERE audit_id = $1")
        .bind(audit_id)
        .execute(&mut *tx)
        .await?;

    for (order_index, slide) in tree.slides.iter().enumerate() {
        let slide_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO audit_slides (id, audit_id, order_index, name, description,
                is_home, content_html, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(slide_id)
        .bind(audit_id)
        .bind(order_index as i32)
        .bind(&slide.name)
        .bind(&slide.description)
        .bind(slide.is_home)
        .bind(&slide.content_html)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        for (finding_index, finding) in slide.findings.iter().enumerate() {
            let finding_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO audit_findings (id, slide_id, order_index, title, description,
                    recommendation, severity)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(finding_id)
            .bind(slide_id)
            .bind(finding_index as i32)
            .bind(&finding.title)
            .bind(&finding.description)
            .bind(&finding.recommendation)
            .bind(finding.severity)
            .execute(&mut *tx)
            .await?;

            for chat_id in &finding.example_chat_ids {
                sqlx::query(
                    "INSERT INTO audit_finding_examples (id, finding_id, chat_id) VALUES ($1, $2, $3)",
                )
                .bind(Uuid::new_v4())
                .bind(finding_id)
                .bind(chat_id)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    for tag in &tree.tags {
        sqlx::query("INSERT INTO audit_tag_cloud (id, audit_id, tag, weight) VALUES ($1, $2, $3, $4)")
            .bind(Uuid::new_v4())
            .bind(audit_id)
            .bind(&tag.tag)
            .bind(tag.weight)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    info!(
        "Report tree replaced for audit {}: {} slides, {} tags",
        audit_id,
        tree.slides.len(),
        tree.tags.len()
    );
    Ok(())
}

impl AuditSlide {
    pub async fn for_audit(pool: &PgPool, audit_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditSlide>(
            "SELECT * FROM audit_slides WHERE audit_id = $1 ORDER BY order_index ASC",
        )
        .bind(audit_id)
        .fetch_all(pool)
        .await
    }
}

impl AuditFinding {
    pub async fn for_slide(pool: &PgPool, slide_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditFinding>(
            "SELECT * FROM audit_findings WHERE slide_id = $1 ORDER BY order_index ASC",
        )
        .bind(slide_id)
        .fetch_all(pool)
        .await
    }
}

impl AuditFindingExample {
    pub async fn for_finding(pool: &PgPool, finding_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditFindingExample>(
            "SELECT * FROM audit_finding_examples WHERE finding_id = $1",
        )
        .bind(finding_id)
        .fetch_all(pool)
        .await
    }
}

impl AuditTagCloud {
    pub async fn for_audit(pool: &PgPool, audit_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AuditTagCloud>(
            "SELECT * FROM audit_tag_cloud WHERE audit_id = $1 ORDER BY weight DESC",
        )
        .bind(audit_id)
        .fetch_all(pool)
        .await
    }
}
