//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline:
//! the parsed JSON body that stages validate and rewrite in place, and the
//! output status and body a stage sets when it answers the request itself.

use crate::types::{Response, ResponseExt};
use http::StatusCode;
use serde_json::Value;
use sieve_core::RequestId;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Context that flows through the middleware pipeline.
///
/// Owned by exactly one request and passed by `&mut`; no locking needed.
///
/// # Example
///
/// ```
/// use sieve_middleware::MiddlewareContext;
/// use serde_json::json;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_body(json!({ "author": "u123" }));
/// assert_eq!(ctx.body()["author"], "u123");
/// assert!(ctx.status().is_none());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    started_at: Instant,

    /// Parsed request body. `{}` until the body stage runs.
    body: Value,

    /// Output status set by a stage that answers the request itself.
    status: Option<StatusCode>,

    /// Output body paired with `status`.
    response_body: Option<Value>,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            body: Value::Object(serde_json::Map::new()),
            status: None,
            response_body: None,
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Returns the request body for in-place edits.
    pub fn body_mut(&mut self) -> &mut Value {
        &mut self.body
    }

    /// Replaces the request body.
    pub fn set_body(&mut self, body: Value) {
        self.body = body;
    }

    /// Takes the request body, leaving `null` behind.
    pub fn take_body(&mut self) -> Value {
        self.body.take()
    }

    /// Returns the output status, if a stage set one.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the output body, if a stage set one.
    #[must_use]
    pub fn response_body(&self) -> Option<&Value> {
        self.response_body.as_ref()
    }

    /// Sets the output status and body.
    pub fn respond(&mut self, status: StatusCode, body: Value) {
        self.status = Some(status);
        self.response_body = Some(body);
    }

    /// Builds the JSON response from the output status and body.
    ///
    /// Returns `None` until [`respond`](Self::respond) was called.
    #[must_use]
    pub fn response(&self) -> Option<Response> {
        let status = self.status?;
        let body = self.response_body.as_ref().unwrap_or(&Value::Null);
        Some(Response::json(status, body))
    }

    /// Stores a typed extension value.
    ///
    /// ```
    /// use sieve_middleware::MiddlewareContext;
    ///
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(Tenant("acme"));
    /// assert_eq!(ctx.get_extension::<Tenant>().unwrap().0, "acme");
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
