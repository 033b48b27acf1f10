use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Store(String),

    #[error("{0}")]
    Validation(String),

    #[error("phone number must contain exactly 11 digits")]
    InvalidPhone,

    #[error("no such slot for that date: {0}")]
    InvalidSlot(String),

    #[error("slot is fully booked")]
    NoCapacity,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Store(_) => "STORE_ERROR",
            AppError::Validation(_) => "VALIDATION",
            AppError::InvalidPhone => "INVALID_PHONE",
            AppError::InvalidSlot(_) => "INVALID_SLOT",
            AppError::NoCapacity => "NO_CAPACITY",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_)
            | AppError::InvalidPhone
            | AppError::InvalidSlot(_) => StatusCode::BAD_REQUEST,
            AppError::NoCapacity => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let body = serde_json::json!({
            "error": { "code": self.code(), "message": self.to_string() }
        });
        (status, axum::Json(body)).into_response()
    }
}
