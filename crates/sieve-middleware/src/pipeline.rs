//! Fixed-order request pipeline.
//!
//! A route's pipeline runs the stages in this order:
//!
//! 1. **Error formatting** - outermost; turns any error or panic below into JSON
//! 2. **JSON body** - parses the request body into the context
//! 3. **Resolution** - external references (optional)
//! 4. **Validation** - route schema, over the resolved body (optional)
//!
//! Extra stages added with [`PipelineBuilder::stage`] run after these, right
//! before the handler.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{
    ErrorFormatter, ErrorFormattingMiddleware, JsonBodyMiddleware, ResolutionMiddleware,
    ValidationMiddleware,
};
use crate::types::{Request, Response};
use sieve_core::SieveResult;
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A route's request pipeline.
///
/// Immutable once built; share it between requests.
///
/// # Example
///
/// ```
/// use sieve_middleware::{Pipeline, Response, ResponseExt};
/// use sieve_middleware::stages::ValidationMiddleware;
/// use sieve_core::Schema;
/// use bytes::Bytes;
/// use http::StatusCode;
/// use http_body_util::Full;
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::builder()
///     .validate(ValidationMiddleware::new(Schema::object(vec![
///         ("title", Schema::string().required()),
///     ])))
///     .build();
///
/// let request = http::Request::post("/posts")
///     .body(Full::new(Bytes::from_static(br#"{"title":"Dune"}"#)))
///     .unwrap();
///
/// let response = pipeline
///     .process(request, |ctx, _req| {
///         let body = ctx.body().clone();
///         Box::pin(async move { Ok(Response::json(StatusCode::CREATED, &body)) })
///     })
///     .await;
/// assert_eq!(response.status(), StatusCode::CREATED);
/// # });
/// ```
pub struct Pipeline {
    formatter: ErrorFormattingMiddleware,
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request with a fresh context.
    pub async fn process<H>(&self, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, SieveResult<Response>>
            + Send
            + 'static,
    {
        self.process_with(MiddlewareContext::new(), request, handler)
            .await
    }

    /// Processes a request with a caller-supplied context.
    pub async fn process_with<H>(
        &self,
        mut ctx: MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, SieveResult<Response>>
            + Send
            + 'static,
    {
        let next = self.build_chain(handler);
        self.formatter.run(&mut ctx, request, next).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, SieveResult<Response>>
            + Send
            + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order, formatter first.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        std::iter::once(self.formatter.name())
            .chain(self.stages.iter().map(|mw| mw.name()))
            .collect()
    }

    /// Returns the number of stages, formatter included.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len() + 1
    }

    /// Returns the formatter used by this pipeline.
    #[must_use]
    pub fn formatter(&self) -> ErrorFormatter {
        self.formatter.formatter()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    formatter: Option<ErrorFormatter>,
    validation: Option<ValidationMiddleware>,
    resolution: Option<ResolutionMiddleware>,
    extra: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the route schema stage.
    #[must_use]
    pub fn validate(mut self, validation: ValidationMiddleware) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Sets the reference resolution stage.
    #[must_use]
    pub fn resolve(mut self, resolution: ResolutionMiddleware) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// Appends a stage that runs after the built-in ones.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.extra.push(Arc::new(middleware));
        self
    }

    /// Overrides the process-wide error formatter for this pipeline.
    #[must_use]
    pub fn error_formatter(mut self, formatter: ErrorFormatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Builds the pipeline.
    ///
    /// Without an explicit formatter, the process-wide one is captured now.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let formatter = match self.formatter {
            Some(formatter) => ErrorFormattingMiddleware::with_formatter(formatter),
            None => ErrorFormattingMiddleware::new(),
        };

        let mut stages: Vec<BoxedMiddleware> = vec![Arc::new(JsonBodyMiddleware::new())];
        if let Some(resolution) = self.resolution {
            stages.push(Arc::new(resolution));
        }
        if let Some(validation) = self.validation {
            stages.push(Arc::new(validation));
        }
        stages.extend(self.extra);

        Pipeline { formatter, stages }
    }
}

/// Built-in stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: error formatting
    ErrorFormatting = 1,
    /// Stage 2: JSON body parsing
    JsonBody = 2,
    /// Stage 3: reference resolution
    Resolution = 3,
    /// Stage 4: route schema validation
    Validation = 4,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ErrorFormatting => "error_formatting",
            Self::JsonBody => "json_body",
            Self::Validation => "validation",
            Self::Resolution => "resolution",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Stage; 4] {
        [
            Self::ErrorFormatting,
            Self::JsonBody,
            Self::Resolution,
            Self::Validation,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::ResolverMap;
    use crate::types::ResponseExt;
    use crate::FnMiddleware;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::{BodyExt, Full};
    use serde_json::json;
    use sieve_core::{Schema, SieveError, ValidationOptions};

    fn request(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/posts")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    fn builder() -> PipelineBuilder {
        Pipeline::builder().error_formatter(ErrorFormatter::new(false))
    }

    #[test]
    fn test_stage_order() {
        let pipeline = builder()
            .resolve(ResolutionMiddleware::new(ResolverMap::new()))
            .validate(ValidationMiddleware::new(Schema::open_object()))
            .stage(FnMiddleware::new("audit", |ctx, request, next| {
                Box::pin(async move { next.run(ctx, request).await })
            }))
            .build();

        assert_eq!(
            pipeline.stage_names(),
            vec!["error_formatting", "json_body", "resolution", "validation", "audit"]
        );
        assert_eq!(pipeline.stage_count(), 5);
    }

    #[test]
    fn test_stage_enum_matches_names() {
        let pipeline = builder()
            .resolve(ResolutionMiddleware::new(ResolverMap::new()))
            .validate(ValidationMiddleware::new(Schema::open_object()))
            .build();

        let names: Vec<_> = Stage::all().iter().map(|s| s.name()).collect();
        assert_eq!(names, pipeline.stage_names());
        assert!(Stage::Resolution < Stage::Validation);
    }

    #[test]
    fn test_minimal_pipeline() {
        let pipeline = builder().build();
        assert_eq!(pipeline.stage_names(), vec!["error_formatting", "json_body"]);
        assert!(!pipeline.formatter().expose_stack());
    }

    #[tokio::test]
    async fn test_handler_sees_parsed_body() {
        let pipeline = builder().build();
        let response = pipeline
            .process(request(r#"{"title":"Dune"}"#), |ctx, _req| {
                let title = ctx.body()["title"].clone();
                Box::pin(async move { Ok(Response::json(StatusCode::OK, &title)) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_handler_error_is_formatted() {
        let pipeline = builder().build();
        let response = pipeline
            .process(request(""), |_ctx, _req| {
                Box::pin(async { Err(SieveError::not_found("Post", "p1")) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_handler_schema_failure_is_validation_error() {
        let pipeline = builder().build();
        let response = pipeline
            .process(request(r#"{"age":"x"}"#), |ctx, _req| {
                let body = ctx.body().clone();
                Box::pin(async move {
                    let schema = Schema::object(vec![("age", Schema::integer().required())]);
                    let checked = schema.validate(&body, &ValidationOptions::default())?;
                    Ok::<_, SieveError>(Response::json(StatusCode::OK, &checked))
                })
            })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["name"], "ValidationError");
        assert_eq!(body["details"][0]["path"], json!(["age"]));
        assert!(!body["details"].to_string().contains("\"x\""));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let pipeline = builder().build();
        let response = pipeline
            .process(request("{oops"), |_ctx, _req| {
                Box::pin(async { Ok(Response::json(StatusCode::OK, &json!({}))) })
            })
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
