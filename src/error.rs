use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

pub const NOT_AUTHORIZED: &str = "Not authorized to perform this action";
pub const SERVER_ERROR: &str = "Server error, please try again later";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{}", NOT_AUTHORIZED)]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to the caller. Internal failures never leak details.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Storage(_) => "Image upload failed".to_string(),
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                SERVER_ERROR.to_string()
            }
            _ => self.to_string(),
        }
    }

    pub fn log(&self) {
        match self {
            AppError::DbError(err) => tracing::error!(error = %err, "database failure"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm failure"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal failure"),
            AppError::Storage(reason) => tracing::warn!(%reason, "object storage failure"),
            _ => tracing::debug!(error = %self, "request rejected"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = ApiResponse::<()>::failure(self.public_message());
        (self.status(), axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_failures_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"));
        assert_eq!(err.public_message(), SERVER_ERROR);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = AppError::OrmError(sea_orm::DbErr::Custom("deadlock detected".into()));
        assert_eq!(err.public_message(), SERVER_ERROR);
    }

    #[test]
    fn validation_message_passes_through() {
        let err = AppError::Validation("quantity: too large\nphone_number: invalid".into());
        assert_eq!(err.public_message(), "quantity: too large\nphone_number: invalid");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn unauthorized_becomes_failed_envelope() {
        let resp = ApiResponse::<()>::from_result(Err(AppError::Unauthorized));
        assert!(!resp.success);
        assert_eq!(resp.message, NOT_AUTHORIZED);
        assert_eq!(AppError::Unauthorized.to_string(), NOT_AUTHORIZED);
        assert!(resp.message.to_lowercase().starts_with("not authorized"));
        assert!(resp.data.is_none());
    }
}
