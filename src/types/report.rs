use serde::Serialize;
use uuid::Uuid;

use crate::models::{AuditFinding, AuditSlide, AuditTagCloud};

#[derive(Serialize)]
pub struct ReportResponse {
    pub slides: Vec<SlideWithFindings>,
    pub tags: Vec<AuditTagCloud>,
}

#[derive(Serialize)]
pub struct SlideWithFindings {
    #[serde(flatten)]
    pub slide: AuditSlide,
    pub findings: Vec<FindingWithExamples>,
}

#[derive(Serialize)]
pub struct FindingWithExamples {
    #[serde(flatten)]
    pub finding: AuditFinding,
    pub example_chat_ids: Vec<Uuid>,
}
