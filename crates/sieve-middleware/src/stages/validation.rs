//! Request body validation.
//!
//! Validates the context body against a route schema. On success the body is
//! replaced by the coerced value (unknown keys stripped, numeric strings
//! converted) and the request continues. On a payload violation the stage
//! answers with 400 and every field error, redacted:
//!
//! ```json
//! {
//!   "error": "ValidationError",
//!   "fields": [
//!     { "path": ["title"], "message": "\"title\" is required", "type": "any.required",
//!       "context": { "label": "title", "key": "title" } }
//!   ]
//! }
//! ```
//!
//! A broken schema is not a client error; it propagates as
//! `SieveError::Internal` to the error formatter.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};
use http::StatusCode;
use serde_json::json;
use sieve_core::{Schema, SchemaError, SieveError, SieveResult, ValidationOptions};
use std::sync::Arc;

/// What [`apply`] did with the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The body was valid and replaced by its coerced value.
    Applied,
    /// The body was invalid; the context holds a 400 response.
    Rejected,
}

/// Validates the context body against `schema`.
///
/// Exactly one of these holds afterwards: the coerced body is in the context
/// and the outcome is `Applied`, or the context carries a 400 response and
/// the outcome is `Rejected`.
///
/// # Errors
///
/// Returns `SieveError::Internal` if the schema definition is invalid.
///
/// # Example
///
/// ```
/// use sieve_middleware::stages::validation::{apply, ValidationOutcome};
/// use sieve_middleware::MiddlewareContext;
/// use sieve_core::{Schema, ValidationOptions};
/// use serde_json::json;
///
/// let schema = Schema::object(vec![("title", Schema::string().required())]);
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_body(json!({ "title": "Dune", "draft": true }));
///
/// let outcome = apply(&mut ctx, &schema, &ValidationOptions::default()).unwrap();
/// assert_eq!(outcome, ValidationOutcome::Applied);
/// assert_eq!(ctx.body(), &json!({ "title": "Dune" }));
/// ```
pub fn apply(
    ctx: &mut MiddlewareContext,
    schema: &Schema,
    options: &ValidationOptions,
) -> SieveResult<ValidationOutcome> {
    match schema.validate(ctx.body(), options) {
        Ok(coerced) => {
            ctx.set_body(coerced);
            Ok(ValidationOutcome::Applied)
        }
        Err(SchemaError::Invalid(report)) => {
            let report = report.redacted();
            let labels: Vec<&str> = report.errors().iter().map(|e| e.label()).collect();
            tracing::debug!(
                request_id = %ctx.request_id(),
                fields = ?labels,
                "request body failed validation"
            );

            ctx.respond(
                StatusCode::BAD_REQUEST,
                json!({ "error": "ValidationError", "fields": report }),
            );
            Ok(ValidationOutcome::Rejected)
        }
        Err(definition) => Err(SieveError::from(definition)),
    }
}

/// Returns the 400 response [`apply`] left in the context.
pub(crate) fn rejection(ctx: &MiddlewareContext) -> SieveResult<Response> {
    ctx.response()
        .ok_or_else(|| SieveError::internal("validation rejected the request without a response"))
}

/// Route-level validation stage.
///
/// ```
/// use sieve_middleware::stages::ValidationMiddleware;
/// use sieve_core::{Schema, ValidationOptions};
///
/// let stage = ValidationMiddleware::new(Schema::object(vec![
///     ("title", Schema::string().min_length(1).required()),
/// ]))
/// .options(ValidationOptions { abort_early: true, ..Default::default() });
/// # let _ = stage;
/// ```
#[derive(Debug, Clone)]
pub struct ValidationMiddleware {
    schema: Arc<Schema>,
    options: ValidationOptions,
}

impl ValidationMiddleware {
    /// Creates a validation stage with default options.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        Self {
            schema: Arc::new(schema),
            options: ValidationOptions::default(),
        }
    }

    /// Sets the validation options.
    #[must_use]
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>> {
        Box::pin(async move {
            match apply(ctx, &self.schema, &self.options)? {
                ValidationOutcome::Applied => next.run(ctx, request).await,
                ValidationOutcome::Rejected => {
                    sieve_telemetry::metrics::record_validation_failure("validation");
                    rejection(ctx)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http_body_util::Full;
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn post_schema() -> Schema {
        Schema::object(vec![
            ("title", Schema::string().min_length(3).required()),
            ("pages", Schema::integer().minimum_int(1)),
            ("secret", Schema::string().max_length(4)),
        ])
    }

    fn request() -> Request {
        http::Request::builder()
            .uri("/posts")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_apply_success_strips_and_coerces() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_body(json!({ "title": "Dune", "pages": "412", "admin": true }));

        let outcome = apply(&mut ctx, &post_schema(), &ValidationOptions::default()).unwrap();
        assert_eq!(outcome, ValidationOutcome::Applied);
        assert_eq!(ctx.body(), &json!({ "title": "Dune", "pages": 412 }));
        assert!(ctx.status().is_none());
    }

    #[test]
    fn test_apply_failure_sets_redacted_400() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_body(json!({ "title": "Du", "secret": "hunter22" }));

        let outcome = apply(&mut ctx, &post_schema(), &ValidationOptions::default()).unwrap();
        assert_eq!(outcome, ValidationOutcome::Rejected);
        assert_eq!(ctx.status(), Some(StatusCode::BAD_REQUEST));

        let body = ctx.response_body().unwrap();
        assert_eq!(body["error"], "ValidationError");
        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        for field in fields {
            assert!(field["context"].get("value").is_none());
        }
        assert!(!body.to_string().contains("hunter22"));
    }

    #[test]
    fn test_apply_definition_error_propagates() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_body(json!({ "id": "x" }));
        let schema = Schema::object(vec![("id", Schema::string().pattern("(["))]);

        let err = apply(&mut ctx, &schema, &ValidationOptions::default()).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(ctx.status().is_none());
    }

    #[tokio::test]
    async fn test_rejection_does_not_call_next() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let stage = ValidationMiddleware::new(post_schema());

        let mut ctx = MiddlewareContext::new();
        ctx.set_body(json!({}));

        let next = Next::handler(move |_ctx, _req| {
            flag.store(true, Ordering::SeqCst);
            Box::pin(async { Ok(Response::json(StatusCode::OK, &Value::Null)) })
        });

        let response = stage.process(&mut ctx, request(), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_success_passes_coerced_body_to_next() {
        let stage = ValidationMiddleware::new(post_schema());
        let mut ctx = MiddlewareContext::new();
        ctx.set_body(json!({ "title": "Dune", "pages": "7" }));

        let next = Next::handler(|ctx, _req| {
            let pages = ctx.body()["pages"].clone();
            Box::pin(async move { Ok(Response::json(StatusCode::OK, &pages)) })
        });

        let response = stage.process(&mut ctx, request(), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(ctx.body()["pages"], 7);
    }
}
