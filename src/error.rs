use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Application-wide error type. Engine code returns these; only the HTTP
/// boundary (the `ResponseError` impl below) turns them into status codes.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("chat {0} has no visible user messages")]
    NoUserActivity(Uuid),

    #[error("audit {0} has no analyzed chats")]
    NoAnalyzedChats(Uuid),

    #[error("model provider error: {0}")]
    UpstreamProvider(String),

    #[error("failed to parse model output ({context})")]
    Parse {
        context: String,
        /// Raw model response, kept for diagnostics.
        raw: String,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    pub fn parse(context: impl Into<String>, raw: impl Into<String>) -> Self {
        AppError::Parse {
            context: context.into(),
            raw: raw.into(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NoUserActivity(_) | AppError::NoAnalyzedChats(_) => StatusCode::CONFLICT,
            AppError::UpstreamProvider(_) | AppError::Parse { .. } => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // 500s keep detail in the logs, clients get a generic body
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {:?}", self);
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({ "error": message }))
    }
}
