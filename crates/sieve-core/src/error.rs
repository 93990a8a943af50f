//! Error types for Sieve.
//!
//! [`SieveError`] is the error type every stage returns through the
//! middleware chain. Each variant belongs to an [`ErrorCategory`], which
//! fixes the HTTP status code and the `name` rendered in error bodies.
//!
//! | Category | Status | Name |
//! |---|---|---|
//! | `Validation` | 400 | `ValidationError` |
//! | `BadRequest` | 400 | `BadRequestError` |
//! | `NotFound` | 404 | `NotFoundError` |
//! | `External` | 502 | `ExternalServiceError` |
//! | `Timeout` | 504 | `TimeoutError` |
//! | `Internal` | 500 | `InternalServerError` |

use crate::schema::{SchemaError, ValidationReport};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`SieveError`].
pub type SieveResult<T> = Result<T, SieveError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Payload failed schema validation.
    Validation,
    /// Malformed request (e.g. unparseable body).
    BadRequest,
    /// Resource not found.
    NotFound,
    /// External service errors (downstream failures).
    External,
    /// Request timeout.
    Timeout,
    /// Internal server errors.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Validation | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::External => StatusCode::BAD_GATEWAY,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error name rendered in response bodies.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Validation => "ValidationError",
            Self::BadRequest => "BadRequestError",
            Self::NotFound => "NotFoundError",
            Self::External => "ExternalServiceError",
            Self::Timeout => "TimeoutError",
            Self::Internal => "InternalServerError",
        }
    }
}

/// Standard error type for Sieve.
///
/// # Example
///
/// ```
/// use sieve_core::{ErrorCategory, SieveError};
///
/// let err = SieveError::not_found("User", "u-42");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code().as_u16(), 404);
/// ```
#[derive(Error, Debug)]
pub enum SieveError {
    /// Payload failed schema validation inside a handler.
    ///
    /// The validation stage answers 400 on its own; handlers checking a
    /// secondary payload reach this variant through `?` on
    /// [`Schema::validate`](crate::Schema::validate).
    #[error("{message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Redacted field errors.
        report: ValidationReport,
    },

    /// Malformed request.
    #[error("{message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found.
    #[error("{resource_type} with ID '{resource_id}' not found")]
    NotFound {
        /// The type of resource that was not found.
        resource_type: String,
        /// The identifier of the resource.
        resource_id: String,
    },

    /// External service error.
    #[error("external service '{service}' failed")]
    External {
        /// The name of the external service.
        service: String,
        /// The underlying failure.
        #[source]
        source: anyhow::Error,
    },

    /// Request timeout.
    #[error("{message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl SieveError {
    /// Creates a validation error from a report. The report is redacted.
    #[must_use]
    pub fn validation(report: ValidationReport) -> Self {
        Self::Validation {
            message: report.to_string(),
            report: report.redacted(),
        }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    /// Creates an external service error.
    pub fn external(service: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::External {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::External { .. } => ErrorCategory::External,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }

    /// Returns the error name rendered in response bodies.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.category().name()
    }

    /// Renders the diagnostic stack: this error followed by its source chain.
    #[must_use]
    pub fn stack(&self) -> String {
        let mut stack = format!("{}: {self}", self.name());
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            stack.push_str("\n    caused by: ");
            stack.push_str(&cause.to_string());
            source = cause.source();
        }
        stack
    }

    /// Converts this error to a serializable response body.
    ///
    /// The stack is attached only when `include_stack` is set.
    #[must_use]
    pub fn to_body(&self, include_stack: bool) -> ErrorBody {
        ErrorBody {
            name: self.name().to_string(),
            message: self.to_string(),
            status: self.status_code().as_u16(),
            details: self.details(),
            stack: include_stack.then(|| self.stack()),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { report, .. } => serde_json::to_value(report).ok(),
            Self::NotFound {
                resource_type,
                resource_id,
            } => Some(serde_json::json!({
                "resource_type": resource_type,
                "resource_id": resource_id
            })),
            Self::External { service, .. } => Some(serde_json::json!({
                "service": service
            })),
            _ => None,
        }
    }
}

impl From<SchemaError> for SieveError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Invalid(report) => Self::validation(report),
            definition @ SchemaError::Definition { .. } => {
                Self::internal_with_source("schema definition is invalid", definition)
            }
        }
    }
}

/// Serializable error body for HTTP responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error name, e.g. `InternalServerError`.
    pub name: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status code.
    pub status: u16,
    /// Additional error details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Rendered diagnostic stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Schema, ValidationOptions};
    use serde_json::json;

    #[test]
    fn test_all_error_categories_have_status_codes() {
        let categories = [
            ErrorCategory::Validation,
            ErrorCategory::BadRequest,
            ErrorCategory::NotFound,
            ErrorCategory::External,
            ErrorCategory::Timeout,
            ErrorCategory::Internal,
        ];

        for category in categories {
            let status = category.default_status_code();
            assert!(
                status.is_client_error() || status.is_server_error(),
                "Category {category:?} should map to error status code, got {status}"
            );
        }
    }

    #[test]
    fn test_not_found_body() {
        let error = SieveError::not_found("User", "user-123");
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);

        let body = error.to_body(false);
        assert_eq!(body.name, "NotFoundError");
        assert_eq!(body.status, 404);
        assert_eq!(body.message, "User with ID 'user-123' not found");
        assert_eq!(body.details.unwrap()["resource_id"], "user-123");
        assert!(body.stack.is_none());
    }

    #[test]
    fn test_stack_renders_source_chain() {
        let root = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let error = SieveError::internal_with_source("lookup pool exhausted", root);

        let stack = error.stack();
        assert!(stack.starts_with("InternalServerError: lookup pool exhausted"));
        assert!(stack.contains("caused by: connection reset"));

        let body = error.to_body(true);
        assert_eq!(body.stack.as_deref(), Some(stack.as_str()));
    }

    #[test]
    fn test_body_omits_absent_fields() {
        let json = serde_json::to_value(SieveError::timeout("too slow").to_body(false)).unwrap();
        assert_eq!(
            json,
            json!({ "name": "TimeoutError", "message": "too slow", "status": 504 })
        );
    }

    #[test]
    fn test_schema_errors_convert_by_class() {
        let schema = Schema::object(vec![("age", Schema::integer().minimum_int(18))]);
        let invalid = schema
            .validate(&json!({ "age": 3 }), &ValidationOptions::default())
            .unwrap_err();
        let error = SieveError::from(invalid);
        assert_eq!(error.category(), ErrorCategory::Validation);
        let details = error.to_body(false).details.unwrap();
        assert!(details[0]["context"].get("value").is_none());

        let broken = Schema::string().pattern("[").check().unwrap_err();
        let error = SieveError::from(broken);
        assert_eq!(error.category(), ErrorCategory::Internal);
        assert!(error.stack().contains("invalid pattern"));
    }
}
