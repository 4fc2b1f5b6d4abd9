//! Shared API types
//!
//! Error responses and the envelopes every generated route returns.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::data::DataError;
use crate::domain::entity::{FieldViolation, ServiceError};
use crate::domain::query::{QueryError, QueryResult};

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    Validation { message: String, details: Vec<FieldViolation> },
    NotFound { code: String, message: String },
    MethodNotAllowed { message: String },
    Conflict { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        if let DataError::Conflict(message) = e {
            return Self::Conflict {
                code: "CONFLICT".to_string(),
                message,
            };
        }
        tracing::error!(error = %e, "Data error");
        Self::internal("Database operation failed")
    }
}

impl From<QueryError> for ApiError {
    fn from(e: QueryError) -> Self {
        Self::bad_request(e.code(), e.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::NotFound { .. } => Self::not_found("NOT_FOUND", e.to_string()),
            ServiceError::ValidationFailed(details) => Self::Validation {
                message: format!("Validation failed for {} field(s)", details.len()),
                details,
            },
            ServiceError::Query(q) => q.into(),
            ServiceError::Unsupported { .. } => Self::MethodNotAllowed {
                message: e.to_string(),
            },
            ServiceError::Internal(data) => Self::from_data(data),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message, details) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message, None)
            }
            Self::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "bad_request",
                "VALIDATION_FAILED".to_string(),
                message,
                Some(details),
            ),
            Self::NotFound { code, message } => {
                (StatusCode::NOT_FOUND, "not_found", code, message, None)
            }
            Self::MethodNotAllowed { message } => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "METHOD_NOT_ALLOWED".to_string(),
                message,
                None,
            ),
            Self::Conflict { code, message } => {
                (StatusCode::CONFLICT, "conflict", code, message, None)
            }
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
                None,
            ),
        };
        let mut body = serde_json::json!({
            "error": error_type,
            "code": code,
            "message": message
        });
        if let Some(details) = details {
            body["details"] = serde_json::to_value(details).unwrap_or_default();
        }
        (status, Json(body)).into_response()
    }
}

/// Error body as documented in OpenAPI
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldViolation>>,
}

/// Single-entity envelope
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Pagination metadata in list responses
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListMeta {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl ListMeta {
    pub fn new(page: u32, page_size: u32, total: u64) -> Self {
        Self {
            total,
            page,
            page_size,
            total_pages: total.div_ceil(u64::from(page_size.max(1))),
        }
    }
}

/// Collection envelope
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub meta: ListMeta,
}

impl<T> ListResponse<T> {
    pub fn new(result: QueryResult<T>, page: u32, page_size: u32) -> Self {
        Self {
            meta: ListMeta::new(page, page_size, result.total_count),
            data: result.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::{Value, json};

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_query_errors_are_bad_requests() {
        let (status, body) =
            render(QueryError::invalid_field("nope", "unknown field").into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_FIELD");
        assert_eq!(body["error"], "bad_request");

        let (_, body) = render(QueryError::InvalidPagination("limit".into()).into()).await;
        assert_eq!(body["code"], "INVALID_PAGINATION");
    }

    #[tokio::test]
    async fn test_validation_failure_carries_details() {
        let err = ServiceError::ValidationFailed(vec![FieldViolation::new(
            "name",
            "required",
            "name is required",
        )]);
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"][0]["field"], "name");
        assert_eq!(body["details"][0]["code"], "required");
    }

    #[tokio::test]
    async fn test_service_error_statuses() {
        let (status, body) = render(ServiceError::not_found("members", "m-1").into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let unsupported = ServiceError::Unsupported {
            entity: "plans".into(),
            operation: "create",
        };
        let (status, _) = render(unsupported.into()).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_internal_errors_are_not_leaked() {
        let err = ServiceError::Internal(DataError::migration_failed(
            "sqlite",
            1,
            "init",
            "secret detail",
        ));
        let (status, body) = render(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL");
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn test_list_meta_pages() {
        assert_eq!(
            serde_json::to_value(ListMeta::new(2, 10, 25)).unwrap(),
            json!({"total": 25, "page": 2, "pageSize": 10, "totalPages": 3})
        );
        assert_eq!(ListMeta::new(1, 10, 0).total_pages, 0);
    }
}
