use actix_web::{post, web};
use std::sync::Arc;
use uuid::Uuid;

use crate::analysis::AnalysisOutcome;
use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::scheduler::run_analysis_tick;
use crate::types::NextAnalysisResponse;
use crate::AppState;

#[post("/chats/{chat_id}/analysis")]
pub async fn analyze_chat(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
    chat_id: web::Path<Uuid>,
) -> Result<web::Json<AnalysisOutcome>, AppError> {
    let outcome = app_state.analysis.analyze(chat_id.into_inner()).await?;
    Ok(web::Json(outcome))
}

/// Manual trigger for one pending-work tick: analyze the single most
/// overdue chat, if any.
#[post("/analysis/next")]
pub async fn analyze_next(
    app_state: web::Data<Arc<AppState>>,
    _user: AuthenticatedUser,
) -> Result<web::Json<NextAnalysisResponse>, AppError> {
    let chat_id = run_analysis_tick(&app_state.selector, &app_state.analysis).await?;
    Ok(web::Json(NextAnalysisResponse { chat_id }))
}
