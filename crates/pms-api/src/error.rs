//! API errors and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use pms_core::error::DomainError;
use pms_core::validation::FieldError;

use crate::response::ApiResponse;

pub const INVALID_CREDENTIALS: &str = "Email atau password salah.";
pub const INTERNAL_MESSAGE: &str = "Terjadi kesalahan pada server";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Detail of a 500, attached to the response for the error-logging
/// middleware. Never serialized by itself.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden("Anda tidak memiliki akses ke resource ini".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated | ApiError::InvalidToken | ApiError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(errors) => ApiError::Validation(errors),
            DomainError::Duplicate { field, message } => {
                ApiError::Validation(vec![FieldError::new(&field, message)])
            }
            DomainError::InvalidCredentials => ApiError::InvalidCredentials,
            DomainError::InvalidToken => {
                ApiError::BadRequest("Token tidak valid atau sudah kedaluwarsa".to_string())
            }
            DomainError::NotFound(label) => ApiError::NotFound(format!("{} tidak ditemukan", label)),
            DomainError::Forbidden(message) => ApiError::Forbidden(message),
            DomainError::InvalidState(message) | DomainError::Attachment(message) => {
                ApiError::BadRequest(message)
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(errors) => {
                ApiResponse::failure("Validasi gagal", Some(errors.clone()))
            }
            ApiError::BadRequest(message)
            | ApiError::Forbidden(message)
            | ApiError::NotFound(message) => ApiResponse::failure(message, None),
            ApiError::Unauthenticated => ApiResponse::failure("Autentikasi diperlukan", None),
            ApiError::InvalidToken => {
                ApiResponse::failure("Token tidak valid atau sudah kedaluwarsa", None)
            }
            ApiError::InvalidCredentials => ApiResponse::failure(INVALID_CREDENTIALS, None),
            ApiError::Internal(_) => ApiResponse::failure(INTERNAL_MESSAGE, None),
        };

        let mut response = body.into_response_with(status);
        if let ApiError::Internal(detail) = self {
            response.extensions_mut().insert(InternalDetail(detail));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_mapping() {
        let cases = vec![
            (DomainError::field("name", "wajib"), StatusCode::BAD_REQUEST),
            (DomainError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (DomainError::NotFound("Unit"), StatusCode::NOT_FOUND),
            (DomainError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (DomainError::InvalidState("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::DatabaseError("down".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                DomainError::Duplicate {
                    field: "email".into(),
                    message: "Email sudah terdaftar".into(),
                },
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (domain, status) in cases {
            assert_eq!(ApiError::from(domain).status(), status);
        }
    }

    #[test]
    fn test_internal_detail_attached_not_rendered() {
        let response = ApiError::Internal("pool timed out".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let detail = response.extensions().get::<InternalDetail>().unwrap();
        assert_eq!(detail.0, "pool timed out");
    }
}
