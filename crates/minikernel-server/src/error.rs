//! Shared API error type for HTTP handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use minikernel::KernelError;
use thiserror::Error;

use crate::state::ErrorResponse;

/// Application error type surfaced by handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error("missing required query parameter 'code'")]
    MissingCode,

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Kernel(err) => err.kind(),
            AppError::MissingCode => "MissingParameter",
            AppError::Join(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Kernel(KernelError::NameNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Kernel(KernelError::Encode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Kernel(_) | AppError::MissingCode => StatusCode::BAD_REQUEST,
            AppError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status(),
            Json(ErrorResponse {
                kind: self.kind().to_string(),
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_kind() {
        let missing = AppError::from(KernelError::NameNotFound("df".into()));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.kind(), "NameNotFound");

        let syntax = AppError::from(minikernel::parse_to_record("x = (").unwrap_err());
        assert_eq!(syntax.status(), StatusCode::BAD_REQUEST);

        let encode = AppError::from(minikernel::parse_to_record("b''").unwrap_err());
        assert_eq!(encode.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(encode.kind(), "UnhandledConstantKind");

        assert_eq!(AppError::MissingCode.status(), StatusCode::BAD_REQUEST);
    }
}
