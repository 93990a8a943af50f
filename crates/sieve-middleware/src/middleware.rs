//! Core middleware trait and types.
//!
//! This module defines the [`Middleware`] trait that all stages implement.
//! A stage receives the per-request context, the request, and a [`Next`]
//! callback. It returns `Ok(response)` or an [`SieveError`] that travels
//! back up the chain to the error formatter.
//!
//! # Example
//!
//! ```
//! use sieve_middleware::{BoxFuture, Middleware, MiddlewareContext, Next, Request, Response};
//! use sieve_core::SieveResult;
//!
//! struct RequireBody;
//!
//! impl Middleware for RequireBody {
//!     fn name(&self) -> &'static str {
//!         "require_body"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, SieveResult<Response>> {
//!         Box::pin(async move {
//!             if ctx.body().as_object().is_some_and(|o| o.is_empty()) {
//!                 return Err(sieve_core::SieveError::bad_request("body must not be empty"));
//!             }
//!             next.run(ctx, request).await
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use sieve_core::SieveResult;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The route handler invoked at the end of the chain.
///
/// It sees the context after every stage ran (the validated body in
/// particular) and returns a `'static` future.
pub type Handler<'a> = Box<
    dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, SieveResult<Response>>
        + Send
        + 'a,
>;

/// The core middleware trait.
///
/// # Invariants
///
/// - Middleware calls `next.run()` at most once
/// - Middleware that short-circuits returns its own response
/// - Errors it does not own are returned unchanged
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this middleware stage.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>>;
}

/// Callback to invoke the next middleware in the chain.
///
/// Consumed by [`Next::run`], so it can only be called once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Handler<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke `middleware`, then `next`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, SieveResult<Response>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> SieveResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A middleware built from a closure.
///
/// ```
/// use sieve_middleware::{FnMiddleware, Middleware};
///
/// let stamp = FnMiddleware::new("stamp", |ctx, request, next| {
///     Box::pin(async move {
///         if let Some(body) = ctx.body_mut().as_object_mut() {
///             body.insert("received".into(), true.into());
///         }
///         next.run(ctx, request).await
///     })
/// });
/// assert_eq!(stamp.name(), "stamp");
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a mut MiddlewareContext,
            Request,
            Next<'a>,
        ) -> BoxFuture<'a, SieveResult<Response>>
        + Send
        + Sync
        + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(
            &'a mut MiddlewareContext,
            Request,
            Next<'a>,
        ) -> BoxFuture<'a, SieveResult<Response>>
        + Send
        + Sync
        + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>> {
        (self.func)(ctx, request, next)
    }
}
