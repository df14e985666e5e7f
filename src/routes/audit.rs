use actix_web::{get, post, web};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AuditFinding, AuditFindingExample, AuditSlide, AuditTagCloud};
use crate::store::ReportStore;
use crate::synthesis::ReportSummary;
use crate::types::{FindingWithExamples, ReportResponse, SlideWithFindings};
use crate::AppState;

#[post("/audits/{audit_id}/report")]
pub async fn synthesize_report(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    audit_id: web::Path<Uuid>,
) -> Result<web::Json<ReportSummary>, AppError> {
    let summary = app_state.synthesizer.synthesize(audit_id.into_inner()).await?;
    Ok(web::Json(summary))
}

#[get("/audits/{audit_id}/report")]
pub async fn get_report(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    audit_id: web::Path<Uuid>,
) -> Result<web::Json<ReportResponse>, AppError> {
    let audit_id = audit_id.into_inner();
    app_state
        .store
        .audit_by_id(audit_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("audit {}", audit_id)))?;

    let pool = &app_state.pool;
    let mut slides = Vec::new();
    for slide in AuditSlide::for_audit(pool, audit_id).await? {
        let mut findings = Vec::new();
        for finding in AuditFinding::for_slide(pool, slide.id).await? {
            let example_chat_ids = AuditFindingExample::for_finding(pool, finding.id)
                .await?
                .into_iter()
                .map(|example| example.chat_id)
                .collect();
            findings.push(FindingWithExamples {
                finding,
                example_chat_ids,
            });
        }
        slides.push(SlideWithFindings { slide, findings });
    }

    let tags = AuditTagCloud::for_audit(pool, audit_id).await?;
    Ok(web::Json(ReportResponse { slides, tags }))
}
