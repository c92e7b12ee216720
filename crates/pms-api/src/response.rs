//! Response envelope

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use pms_core::repositories::Page;
use pms_core::validation::FieldError;
use pms_shared::types::Pagination;

/// `{success, data?, message?, error?, errors?, count?, pagination?}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            errors: None,
            count: None,
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<Value> {
    /// Confirmation without payload
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            error: None,
            errors: None,
            count: None,
            pagination: None,
        }
    }

    pub fn failure(message: &str, errors: Option<Vec<FieldError>>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.to_string()),
            error: None,
            errors,
            count: None,
            pagination: None,
        }
    }
}

impl ApiResponse<Vec<Value>> {
    pub fn page(page: Page) -> Self {
        Self {
            count: Some(page.data.len()),
            pagination: Some(page.pagination),
            ..Self::success(page.data)
        }
    }
}

/// Pre-serialized JSON body. Cache hits go out through this unchanged.
pub fn raw_json(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        body,
    )
        .into_response()
}

impl<T: Serialize> ApiResponse<T> {
    pub fn into_response_with(self, status: StatusCode) -> Response {
        match serde_json::to_string(&self) {
            Ok(body) => raw_json(status, body),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        self.into_response_with(StatusCode::OK)
    }
}
