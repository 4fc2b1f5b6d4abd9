//! Path and validation extractors for generated routes

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::types::ApiError;
use crate::core::constants::MAX_ID_LENGTH;
use crate::domain::entity::FieldViolation;

/// Validate entity id length
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH
}

/// Validated `{id}` path segment
#[derive(Debug)]
pub struct EntityIdPath {
    pub id: String,
}

impl<S> FromRequestParts<S> for EntityIdPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&id) {
            return Err(ValidationRejection::InvalidId);
        }
        Ok(Self { id })
    }
}

/// Validation rejection with structured error response
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Entity id empty or too long
    InvalidId,
    /// Failed to parse query string
    Query(QueryRejection),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// Body is valid JSON but not an object
    NotAnObject,
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            // Same envelope as a body schema failure
            Self::NotAnObject => {
                return ApiError::Validation {
                    message: "Request body must be a JSON object".to_string(),
                    details: vec![FieldViolation::new(
                        "",
                        "type",
                        "request body must be a JSON object",
                    )],
                }
                .into_response();
            }
            Self::Path(rejection) => ("PATH_PARSE_ERROR", rejection.body_text()),
            Self::InvalidId => (
                "INVALID_ID",
                format!("Invalid id: must be 1-{} characters", MAX_ID_LENGTH),
            ),
            Self::Query(rejection) => ("QUERY_PARSE_ERROR", rejection.body_text()),
            Self::Json(rejection) => ("JSON_PARSE_ERROR", rejection.body_text()),
            Self::Validation(errors) => ("VALIDATION_ERROR", format_validation_errors(&errors)),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "bad_request",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Query extractor with automatic validation.
///
/// Deserializes query parameters and validates them using the `validator` crate.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

/// JSON object body; field-level checks happen in the entity's body schema
#[derive(Debug)]
pub struct JsonObject(pub Value);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        if !value.is_object() {
            return Err(ValidationRejection::NotAnObject);
        }
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("m-1"));
        assert!(is_valid_id(&"a".repeat(MAX_ID_LENGTH)));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"a".repeat(MAX_ID_LENGTH + 1)));
    }

    #[test]
    fn test_rejection_is_bad_request() {
        let response = ValidationRejection::NotAnObject.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = ValidationRejection::InvalidId.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
