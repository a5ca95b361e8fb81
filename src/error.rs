//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Which lookup failed when a record could not be found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundLevel {
    /// Top-level record addressed by its primary identifier.
    Record,
    /// Parent record of an embedded element.
    Parent,
    /// Embedded element addressed by its secondary identifier.
    Element,
}

impl std::fmt::Display for NotFoundLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotFoundLevel::Record => "record",
            NotFoundLevel::Parent => "parent",
            NotFoundLevel::Element => "element",
        };
        f.write_str(s)
    }
}

/// Coarse classification used by callers and tests that do not care about payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    BadIdentifier,
    BadQuerySyntax,
    NotFound,
    Conflict,
    Validation,
    BadRequest,
    Unauthorized,
    Internal,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid identifier: {0}")]
    BadIdentifier(String),
    #[error("invalid query syntax: {0}")]
    BadQuerySyntax(String),
    #[error("{resource} {level} not found: {key}")]
    NotFound {
        resource: String,
        level: NotFoundLevel,
        key: String,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(resource: impl Into<String>, level: NotFoundLevel, key: impl Into<String>) -> Self {
        AppError::NotFound {
            resource: resource.into(),
            level,
            key: key.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadIdentifier(_) => ErrorKind::BadIdentifier,
            AppError::BadQuerySyntax(_) => ErrorKind::BadQuerySyntax,
            AppError::NotFound { .. } => ErrorKind::NotFound,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::BadRequest(_) => ErrorKind::BadRequest,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Level of a NotFound error, `None` for every other kind.
    pub fn not_found_level(&self) -> Option<NotFoundLevel> {
        match self {
            AppError::NotFound { level, .. } => Some(*level),
            _ => None,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self.kind() {
            ErrorKind::BadIdentifier => (StatusCode::BAD_REQUEST, "bad_identifier"),
            ErrorKind::BadQuerySyntax => (StatusCode::BAD_REQUEST, "bad_query_syntax"),
            ErrorKind::BadRequest => (StatusCode::BAD_REQUEST, "bad_request"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
            ErrorKind::Validation => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
            ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let details = match &self {
            AppError::NotFound { resource, level, key } => Some(serde_json::json!({
                "resource": resource,
                "level": level,
                "key": key,
            })),
            _ => None,
        };
        // Store and driver messages stay in the logs.
        let message = match self.kind() {
            ErrorKind::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        };
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}
