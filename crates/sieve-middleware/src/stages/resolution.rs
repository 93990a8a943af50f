//! External reference resolution.
//!
//! Request bodies often carry lightweight identifiers (`"author": "u123"`,
//! `"editors": ["u1", "u2"]`) where the route needs full objects. The
//! resolution stage looks each mapped field up concurrently, writes the
//! results back into the body, then validates the runtime shape of what it
//! produced:
//!
//! 1. Fan-out: one Tokio task per present mapped field.
//! 2. Fan-in: wait until every task settled. A failed lookup leaves the
//!    field absent (scalar) or a list of `null` placeholders (array).
//! 3. Build an object schema over the looked-up fields: `array(object)` for
//!    arrays, `object` otherwise, each required.
//! 4. Validate. A failed lookup thus becomes a structured 400 on that field.
//!
//! Fields missing from the body are neither looked up nor required. Fields
//! that already hold an object (or an array of objects) are not looked up
//! again but are still checked.
//!
//! Dropping the stage future aborts every in-flight lookup.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::validation::{self, ValidationOutcome},
    types::{Request, Response},
};
use futures_util::FutureExt;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sieve_core::{
    FnLookup, Lookup, LookupError, Presence, Schema, SieveResult, UnknownKeys, ValidationOptions,
};
use sieve_telemetry::metrics;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

/// Per-route table of body field → lookup.
///
/// Built once, then shared read-only by every request to the route.
///
/// # Example
///
/// ```
/// use sieve_middleware::stages::ResolverMap;
/// use sieve_core::LookupError;
/// use serde_json::{json, Value};
///
/// let map = ResolverMap::new()
///     .with_fn("author", |raw: Value| async move {
///         Ok::<_, LookupError>(json!({ "id": raw, "name": "Ann" }))
///     });
/// assert_eq!(map.fields().collect::<Vec<_>>(), vec!["author"]);
/// ```
#[derive(Clone, Default)]
pub struct ResolverMap {
    lookups: IndexMap<String, Arc<dyn Lookup>>,
}

impl ResolverMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `field` to `lookup`.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, lookup: impl Lookup) -> Self {
        self.insert(field, Arc::new(lookup));
        self
    }

    /// Maps `field` to an async closure.
    #[must_use]
    pub fn with_fn<F, Fut>(self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LookupError>> + Send + 'static,
    {
        self.with(field, FnLookup::new(f))
    }

    /// Maps `field` to a shared lookup, replacing any previous mapping.
    pub fn insert(&mut self, field: impl Into<String>, lookup: Arc<dyn Lookup>) {
        self.lookups.insert(field.into(), lookup);
    }

    /// Returns the mapped field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.lookups.keys().map(String::as_str)
    }

    /// Returns the number of mapped fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    /// Returns `true` if no field is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Lookup>)> {
        self.lookups.iter()
    }
}

impl std::fmt::Debug for ResolverMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverMap")
            .field("fields", &self.lookups.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Outcome of resolving one body field.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Not looked up: absent, or already resolved.
    Skipped,
    /// The lookup produced a replacement.
    Resolved(Value),
    /// The lookup failed. `items` is the original array length, if any.
    Failed {
        /// Length of the original array value.
        items: Option<usize>,
    },
}

impl Resolution {
    /// Writes this outcome into `body[field]`.
    ///
    /// A scalar failure removes the key; an array failure leaves `items`
    /// `null` placeholders.
    pub fn apply_to(self, body: &mut Map<String, Value>, field: &str) {
        match self {
            Self::Skipped => {}
            Self::Resolved(value) => {
                body.insert(field.to_string(), value);
            }
            Self::Failed { items: Some(len) } => {
                body.insert(field.to_string(), Value::Array(vec![Value::Null; len]));
            }
            Self::Failed { items: None } => {
                body.remove(field);
            }
        }
    }
}

/// Returns whether `value` already has the resolved shape.
fn is_resolved(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Array(items) => !items.is_empty() && items.iter().all(Value::is_object),
        _ => false,
    }
}

/// Builds the schema checking the runtime shape of `fields` in `body`.
///
/// Keys not listed pass through untouched.
#[must_use]
pub fn runtime_schema(body: &Map<String, Value>, fields: &[String]) -> Schema {
    let properties = fields
        .iter()
        .map(|field| {
            let schema = if body.get(field).is_some_and(Value::is_array) {
                Schema::array(Schema::open_object().required()).required()
            } else {
                Schema::open_object().required()
            };
            (field.clone(), schema)
        })
        .collect();

    Schema::Object {
        required: true,
        properties,
        unknown: Some(UnknownKeys::Allow),
    }
}

type LookupTask = (String, Option<usize>, Result<Value, LookupError>);

/// Resolution stage.
///
/// ```
/// use sieve_middleware::stages::{ResolutionMiddleware, ResolverMap};
/// use sieve_core::{LookupError, Presence};
/// use serde_json::{json, Value};
/// use std::time::Duration;
///
/// let stage = ResolutionMiddleware::new(ResolverMap::new().with_fn("author", |raw: Value| async move {
///     Ok::<_, LookupError>(json!({ "id": raw }))
/// }))
/// .presence(Presence::NonNull)
/// .lookup_timeout(Duration::from_secs(2));
/// # let _ = stage;
/// ```
#[derive(Debug, Clone)]
pub struct ResolutionMiddleware {
    resolvers: Arc<ResolverMap>,
    presence: Presence,
    lookup_timeout: Option<Duration>,
    options: ValidationOptions,
}

impl ResolutionMiddleware {
    /// Creates a resolution stage over `resolvers`.
    #[must_use]
    pub fn new(resolvers: ResolverMap) -> Self {
        Self {
            resolvers: Arc::new(resolvers),
            presence: Presence::default(),
            lookup_timeout: None,
            options: ValidationOptions::default(),
        }
    }

    /// Sets which body values count as present.
    #[must_use]
    pub fn presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// Bounds each lookup. Unset waits for every lookup indefinitely.
    #[must_use]
    pub fn lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = Some(timeout);
        self
    }

    /// Sets the options used to validate the resolved body.
    #[must_use]
    pub fn options(mut self, options: ValidationOptions) -> Self {
        self.options = options;
        self
    }

    /// Looks up every present mapped field and writes the outcomes into the
    /// body. Returns the fields the runtime schema must cover.
    ///
    /// A non-object body is left untouched.
    pub async fn resolve(&self, ctx: &mut MiddlewareContext) -> Vec<String> {
        let request_id = ctx.request_id();
        let Some(body) = ctx.body().as_object() else {
            return Vec::new();
        };

        let mut checked = Vec::new();
        let mut tasks: JoinSet<LookupTask> = JoinSet::new();

        for (field, lookup) in self.resolvers.iter() {
            let Some(raw) = body.get(field) else {
                continue;
            };
            if !self.presence.is_present(raw) {
                continue;
            }
            checked.push(field.clone());
            if is_resolved(raw) {
                tracing::trace!(%request_id, field = %field, "field already resolved");
                continue;
            }

            let raw = raw.clone();
            let items = raw.as_array().map(Vec::len);
            let lookup = Arc::clone(lookup);
            let timeout = self.lookup_timeout;
            let field = field.clone();

            tasks.spawn(async move {
                let outcome = run_lookup(lookup, raw, timeout).await;
                (field, items, outcome)
            });
        }

        if tasks.is_empty() {
            return checked;
        }

        let started = Instant::now();
        let mut settled = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(task) => settled.push(task),
                Err(e) => tracing::error!(%request_id, error = %e, "lookup task did not complete"),
            }
        }
        metrics::record_resolution_duration(started.elapsed());

        let Some(body) = ctx.body_mut().as_object_mut() else {
            return checked;
        };
        for (field, items, outcome) in settled {
            let resolution = match outcome {
                Ok(value) => {
                    metrics::record_lookup(&field, "resolved");
                    Resolution::Resolved(value)
                }
                Err(e) => {
                    tracing::warn!(%request_id, field = %field, error = %e, "lookup failed");
                    metrics::record_lookup(&field, e.outcome());
                    Resolution::Failed { items }
                }
            };
            resolution.apply_to(body, &field);
        }

        checked
    }
}

async fn run_lookup(
    lookup: Arc<dyn Lookup>,
    raw: Value,
    timeout: Option<Duration>,
) -> Result<Value, LookupError> {
    let call = AssertUnwindSafe(async move { lookup.lookup(raw).await }).catch_unwind();
    let settled = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| LookupError::TimedOut)?,
        None => call.await,
    };
    settled.unwrap_or(Err(LookupError::Panicked))
}

impl Middleware for ResolutionMiddleware {
    fn name(&self) -> &'static str {
        "resolution"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, SieveResult<Response>> {
        Box::pin(async move {
            let checked = self.resolve(ctx).await;
            if checked.is_empty() {
                return next.run(ctx, request).await;
            }

            let schema = match ctx.body().as_object() {
                Some(body) => runtime_schema(body, &checked),
                None => return next.run(ctx, request).await,
            };

            match validation::apply(ctx, &schema, &self.options)? {
                ValidationOutcome::Applied => next.run(ctx, request).await,
                ValidationOutcome::Rejected => {
                    metrics::record_validation_failure("resolution");
                    validation::rejection(ctx)
                }
            }
        })
    }
}
