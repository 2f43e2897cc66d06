//! Unified error types for the storefront service.
//!
//! Business logic in [`crate::core`] returns [`Error`]; the HTTP layer maps each
//! variant to a status code in [`crate::api::error`].

use serde::Serialize;
use thiserror::Error;

/// A single failing field reported by request validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path of the field (e.g. `customer_info.phone`)
    pub field: String,
    /// Human-readable message
    pub message: String,
}

impl FieldError {
    /// Creates a field error from a path and message.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Application error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Underlying database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// One or more fields failed validation
    #[error("Validation failed: {}", format_fields(.fields))]
    Validation {
        /// Every failing field, not just the first
        fields: Vec<FieldError>,
    },

    /// Unique index violation
    #[error("A record with this {field} already exists")]
    DuplicateKey {
        /// Name of the duplicated field
        field: String,
    },

    /// Lookup by key found nothing
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record (e.g. "Shipping provider")
        entity: &'static str,
        /// Key used for the lookup
        key: String,
    },

    /// Shipping provider exists but is switched off
    #[error("Shipping provider '{name}' is not active")]
    ProviderInactive {
        /// Provider name
        name: String,
    },

    /// Monetary amount or weight outside the accepted range
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending value
        amount: f64,
    },

    /// Status change outside the transition table under a strict policy
    #[error("Cannot move maintenance request from '{from}' to '{to}'")]
    IllegalTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Customer approval response that does not match the request state
    #[error("Approval conflict: {message}")]
    ApprovalConflict {
        /// Why the response was refused
        message: String,
    },

    /// Missing or invalid credentials
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated, but not allowed
    #[error("Permission denied")]
    Forbidden,

    /// JWT encoding or decoding failed
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Password hashing failed
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Description from the hasher
        message: String,
    },

    /// Device lock encryption failure
    #[error("Encryption error: {message}")]
    Crypto {
        /// Description of the failure
        message: String,
    },

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable failure
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Shorthand for a single-field validation error.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            fields: vec![FieldError::new(field, message)],
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            fields: field_errors(&errors),
        }
    }
}

/// Flattens nested `validator` errors into dotted field paths, sorted by path.
#[must_use]
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut fields = Vec::new();
    collect_validation_errors(None, errors, &mut fields);
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

fn collect_validation_errors(
    prefix: Option<&str>,
    errors: &validator::ValidationErrors,
    out: &mut Vec<FieldError>,
) {
    use validator::ValidationErrorsKind;

    for (name, kind) in errors.errors() {
        let path = prefix.map_or_else(|| (*name).to_string(), |p| format!("{p}.{name}"));
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let message = error
                        .message
                        .as_ref()
                        .map_or_else(|| format!("{path} is invalid"), ToString::to_string);
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                collect_validation_errors(Some(&path), inner, out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation_errors(Some(&format!("{path}[{index}]")), inner, out);
                }
            }
        }
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Maps a unique-constraint violation onto [`Error::DuplicateKey`], passing other errors through.
pub fn map_unique_violation(err: sea_orm::DbErr, field: &str) -> Error {
    match err.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => Error::DuplicateKey {
            field: field.to_string(),
        },
        _ => Error::Database(err),
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = Error::Validation {
            fields: vec![
                FieldError::new("customer_info.name", "Customer name is required"),
                FieldError::new("customer_info.phone", "Customer phone is required"),
            ],
        };
        let text = err.to_string();
        assert!(text.contains("customer_info.name"));
        assert!(text.contains("customer_info.phone"));
    }

    #[test]
    fn test_not_found_formats_entity_and_key() {
        let err = Error::not_found("Shipping provider", 42);
        assert_eq!(err.to_string(), "Shipping provider not found: 42");
    }
}
