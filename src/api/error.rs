//! HTTP mapping of [`Error`] and the JSON extractors used by the handlers.

use crate::errors::{Error, FieldError};
use axum::{
    extract::{
        FromRequest, FromRequestParts,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<FieldError>>,
}

impl Error {
    /// Status code a client sees for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::IllegalTransition { .. }
            | Self::ApprovalConflict { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized | Self::Token(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::DuplicateKey { .. } => StatusCode::CONFLICT,
            Self::ProviderInactive { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Config { .. }
            | Self::Database(_)
            | Self::PasswordHash { .. }
            | Self::Crypto { .. }
            | Self::Io(_)
            | Self::EnvVar(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::Validation { fields } => ErrorBody {
                error: "Validation failed".to_string(),
                fields: Some(fields),
            },
            other if status.is_server_error() => {
                tracing::error!(error = %other, "Request failed");
                ErrorBody {
                    error: "Internal server error".to_string(),
                    fields: None,
                }
            }
            other => ErrorBody {
                error: other.to_string(),
                fields: None,
            },
        };
        (status, axum::Json(body)).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_field("body", rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_field("query", rejection.body_text())
    }
}

/// `axum::Json` whose rejection is reported in the usual error body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` whose rejection is reported in the usual error body
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Error))]
pub struct ApiQuery<T>(pub T);
