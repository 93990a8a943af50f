//! Error response formatting.
//!
//! The outermost stage. Every [`SieveError`] returned by a later stage, and
//! every panic raised below it, is turned into a JSON response:
//!
//! ```json
//! {
//!   "name": "ExternalServiceError",
//!   "message": "external service 'users' failed",
//!   "status": 502,
//!   "details": { "service": "users" },
//!   "stack": "ExternalServiceError: ...\n    caused by: connection reset"
//! }
//! ```
//!
//! `stack` is present only outside production. The policy is process-wide:
//! [`install`] it once at startup; until then it is derived from `SIEVE_ENV`.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response, ResponseExt},
};
use futures_util::FutureExt;
use serde_json::{json, Value};
use sieve_core::{Environment, ErrorBody, SieveError, SieveResult};
use sieve_telemetry::metrics;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;

static FORMATTER: OnceLock<ErrorFormatter> = OnceLock::new();

/// Installs the process-wide formatter.
///
/// Only the first call wins; a later one returns the rejected formatter.
///
/// # Errors
///
/// Returns `formatter` back if one was already installed.
pub fn install(formatter: ErrorFormatter) -> Result<(), ErrorFormatter> {
    FORMATTER.set(formatter)
}

/// Returns the installed formatter, or one derived from `SIEVE_ENV`.
#[must_use]
pub fn installed() -> ErrorFormatter {
    FORMATTER.get().copied().unwrap_or_else(ErrorFormatter::from_env)
}

/// Renders errors as JSON responses.
///
/// ```
/// use sieve_middleware::stages::ErrorFormatter;
/// use sieve_core::{Environment, SieveError};
///
/// let formatter = ErrorFormatter::for_environment(&Environment::Production);
/// let body = formatter.body(&SieveError::internal("db down"));
/// assert_eq!(body.status, 500);
/// assert!(body.stack.is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorFormatter {
    expose_stack: bool,
}

impl ErrorFormatter {
    /// Creates a formatter with an explicit stack policy.
    #[must_use]
    pub const fn new(expose_stack: bool) -> Self {
        Self { expose_stack }
    }

    /// Hides the stack in production, shows it anywhere else.
    #[must_use]
    pub fn for_environment(environment: &Environment) -> Self {
        Self::new(!environment.is_production())
    }

    /// Reads the environment from `SIEVE_ENV`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::for_environment(&Environment::from_env())
    }

    /// Returns whether rendered bodies carry the stack.
    #[must_use]
    pub const fn expose_stack(&self) -> bool {
        self.expose_stack
    }

    /// Builds the response body for `err`.
    #[must_use]
    pub fn body(&self, err: &SieveError) -> ErrorBody {
        err.to_body(self.expose_stack)
    }

    /// Builds the response for `err`.
    #[must_use]
    pub fn format(&self, err: &SieveError) -> Response {
        Response::json(err.status_code(), &render(self.body(err)))
    }
}

fn render(body: ErrorBody) -> Value {
    let mut rendered = json!({
        "name": body.name,
        "message": body.message,
        "status": body.status,
    });
    if let Value::Object(fields) = &mut rendered {
        if let Some(details) = body.details {
            fields.insert("details".to_string(), details);
        }
        if let Some(stack) = body.stack {
            fields.insert("stack".to_string(), Value::String(stack));
        }
    }
    rendered
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        installed()
    }
}

/// Outermost stage turning errors and panics into JSON responses.
#[derive(Debug, Clone, Copy)]
pub struct ErrorFormattingMiddleware {
    formatter: ErrorFormatter,
}

impl ErrorFormattingMiddleware {
    /// Uses the process-wide formatter as of now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_formatter(installed())
    }

    /// Uses `formatter` instead of the process-wide one.
    #[must_use]
    pub const fn with_formatter(formatter: ErrorFormatter) -> Self {
        Self { formatter }
    }

    /// Returns the formatter in use.
    #[must_use]
    pub const fn formatter(&self) -> ErrorFormatter {
        self.formatter
    }

    /// Runs the rest of the chain. Never fails.
    pub async fn run(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        next: Next<'_>,
    ) -> Response {
        let request_id = ctx.request_id();
        let settled = AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await;

        let err = match settled {
            Ok(Ok(response)) => return response,
            Ok(Err(err)) => err,
            Err(payload) => {
                tracing::error!(
                    %request_id,
                    panic = panic_message(payload.as_ref()),
                    "request processing panicked"
                );
                SieveError::internal("request processing panicked")
            }
        };

        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(%request_id, status = status.as_u16(), error = %err.stack(), "request failed");
        } else {
            tracing::warn!(%request_id, status = status.as_u16(), error = %err, "request rejected");
        }
        metrics::record_formatted_error(err.name(), status.as_u16());

        self.formatter.format(&err)
    }
}

impl Default for ErrorFormattingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

impl Middleware for ErrorFormattingMiddleware {
    fn name(&self) -> &'static str {
        "error_formatting"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>> {
        Box::pin(async move { Ok(self.run(ctx, request, next).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use serde_json::{json, Value};

    fn request() -> Request {
        http::Request::builder()
            .uri("/posts")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn failing(err: SieveError) -> Next<'static> {
        Next::handler(move |_ctx, _req| Box::pin(async move { Err(err) }))
    }

    #[test]
    fn test_stack_policy_by_environment() {
        assert!(!ErrorFormatter::for_environment(&Environment::Production).expose_stack());
        assert!(ErrorFormatter::for_environment(&Environment::Development).expose_stack());
        assert!(ErrorFormatter::for_environment(&Environment::Test).expose_stack());
        assert!(ErrorFormatter::for_environment(&Environment::parse("PRODUCTION")).expose_stack());
    }

    #[test]
    fn test_install_only_once() {
        let first = ErrorFormatter::new(false);
        let second = ErrorFormatter::new(true);

        let accepted = install(first).is_ok();
        assert_eq!(install(second), Err(second));
        if accepted {
            assert_eq!(installed(), first);
        }
    }

    #[tokio::test]
    async fn test_error_becomes_json_response() {
        let stage = ErrorFormattingMiddleware::with_formatter(ErrorFormatter::new(true));
        let err = SieveError::external("users", anyhow::anyhow!("connection reset"));

        let mut ctx = MiddlewareContext::new();
        let response = stage.run(&mut ctx, request(), failing(err)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = json_body(response).await;
        assert_eq!(body["name"], "ExternalServiceError");
        assert_eq!(body["status"], 502);
        assert_eq!(body["details"], json!({ "service": "users" }));
        assert!(body["stack"].as_str().unwrap().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_formatted_body_matches_error_body() {
        let formatter = ErrorFormatter::new(false);
        let err = SieveError::not_found("Post", "p1");
        let response = formatter.format(&err);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(response).await;
        assert_eq!(
            body,
            json!({
                "name": "NotFoundError",
                "message": "Post with ID 'p1' not found",
                "status": 404,
                "details": { "resource_type": "Post", "resource_id": "p1" },
            })
        );
        let parsed: ErrorBody = serde_json::from_value(body).unwrap();
        assert_eq!(parsed, formatter.body(&err));
    }

    #[tokio::test]
    async fn test_production_hides_stack() {
        let stage = ErrorFormattingMiddleware::with_formatter(ErrorFormatter::for_environment(
            &Environment::Production,
        ));
        let mut ctx = MiddlewareContext::new();
        let response = stage
            .run(&mut ctx, request(), failing(SieveError::internal("db down")))
            .await;

        let body = json_body(response).await;
        assert_eq!(body["name"], "InternalServerError");
        assert_eq!(body["message"], "db down");
        assert!(body.get("stack").is_none());
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let stage = ErrorFormattingMiddleware::with_formatter(ErrorFormatter::new(false));
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async {
                if true {
                    panic!("handler bug");
                }
                Ok(Response::json(StatusCode::OK, &Value::Null))
            })
        });

        let mut ctx = MiddlewareContext::new();
        let response = stage.run(&mut ctx, request(), next).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!json_body(response).await.to_string().contains("handler bug"));
    }

    #[tokio::test]
    async fn test_success_passes_through() {
        let stage = ErrorFormattingMiddleware::with_formatter(ErrorFormatter::new(true));
        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::json(StatusCode::CREATED, &json!({ "id": 1 }))) })
        });

        let mut ctx = MiddlewareContext::new();
        let response = stage.process(&mut ctx, request(), next).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
