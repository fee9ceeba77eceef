use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::Serialize;

pub type AppResult<T> = Result<T, AppError>;

/// Why a request conflicts with current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictKind {
    SeatUnavailable,
    DuplicateBooking,
    AlreadyTerminal,
    InvalidStatus,
    SeatInUse,
}

impl ConflictKind {
    pub fn code(self) -> &'static str {
        match self {
            ConflictKind::SeatUnavailable => "SEAT_UNAVAILABLE",
            ConflictKind::DuplicateBooking => "DUPLICATE_BOOKING",
            ConflictKind::AlreadyTerminal => "ALREADY_TERMINAL",
            ConflictKind::InvalidStatus => "INVALID_STATUS",
            ConflictKind::SeatInUse => "SEAT_IN_USE",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict ({0:?}): {1}")]
    Conflict(ConflictKind, String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Plan limit reached: {0}")]
    PlanLimit(String),

    #[error("External service failure: {0}")]
    External(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::PlanLimit(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(..) => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::External(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(kind, _) => kind.code(),
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::PlanLimit(_) => "PLAN_LIMIT_REACHED",
            AppError::External(_) => "EXTERNAL_FAILURE",
            AppError::Internal(_) | AppError::Database(_) => "INTERNAL_ERROR",
        }
    }

    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            AppError::Conflict(kind, _) => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(m)
            | AppError::BadRequest(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m)
            | AppError::NotFound(m)
            | AppError::Conflict(_, m)
            | AppError::InvalidState(m)
            | AppError::PlanLimit(m)
            | AppError::External(m) => m.clone(),
            AppError::Internal(m) => {
                tracing::error!(error = %m, "Internal error");
                "Internal server error".to_string()
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Internal server error".to_string()
            }
        };

        let body = ErrorBody {
            error: message,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}
