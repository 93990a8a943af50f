//! JSON body parsing.
//!
//! Reads the request body once, parses it into the context, and hands the
//! request on with its bytes intact. An empty body parses as `{}`.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{Request, Response},
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use serde_json::{Map, Value};
use sieve_core::{SieveError, SieveResult};

/// Parses the request body as JSON into [`MiddlewareContext::body`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBodyMiddleware;

impl JsonBodyMiddleware {
    /// Creates the body parsing stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Parses raw body bytes.
///
/// # Errors
///
/// Returns `SieveError::BadRequest` if the bytes are not valid JSON.
pub fn parse_body(bytes: &[u8]) -> SieveResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| SieveError::bad_request(format!("request body is not valid JSON: {e}")))
}

impl Middleware for JsonBodyMiddleware {
    fn name(&self) -> &'static str {
        "json_body"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes: Bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let parsed = parse_body(&bytes)?;
            tracing::trace!(request_id = %ctx.request_id(), bytes = bytes.len(), "parsed request body");
            ctx.set_body(parsed);

            next.run(ctx, Request::from_parts(parts, Full::new(bytes))).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use http::StatusCode;
    use serde_json::json;

    fn request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/posts")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    fn echo() -> Next<'static> {
        Next::handler(|ctx, _req| {
            let body = ctx.body().clone();
            Box::pin(async move { Ok(Response::json(StatusCode::OK, &body)) })
        })
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(b"").unwrap(), json!({}));
        assert_eq!(parse_body(b"  \n").unwrap(), json!({}));
        assert_eq!(parse_body(br#"{"a":1}"#).unwrap(), json!({ "a": 1 }));
        assert_eq!(parse_body(b"[1,2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_malformed_body_is_bad_request() {
        let err = parse_body(b"{\"a\":").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.name(), "BadRequestError");
    }

    #[tokio::test]
    async fn test_stage_populates_context() {
        let mut ctx = MiddlewareContext::new();
        JsonBodyMiddleware::new()
            .process(&mut ctx, request(r#"{"title":"Dune"}"#), echo())
            .await
            .unwrap();
        assert_eq!(ctx.body(), &json!({ "title": "Dune" }));
    }

    #[tokio::test]
    async fn test_stage_rejects_malformed_json() {
        let mut ctx = MiddlewareContext::new();
        let result = JsonBodyMiddleware::new()
            .process(&mut ctx, request("{not json"), echo())
            .await;
        assert!(matches!(result, Err(SieveError::BadRequest { .. })));
    }
}
