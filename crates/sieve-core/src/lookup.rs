//! External reference lookups.
//!
//! A [`Lookup`] turns a lightweight identifier found in a request body (a
//! string id, or an array of them) into the full object it refers to. The
//! resolution stage calls one lookup per mapped body field, concurrently,
//! and treats any [`LookupError`] as "could not resolve".

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by [`Lookup::lookup`].
pub type LookupFuture = Pin<Box<dyn Future<Output = Result<Value, LookupError>> + Send>>;

/// Async capability resolving a raw body value into a full object.
///
/// The returned future must be `'static`: the resolution stage spawns it on
/// the Tokio runtime. Clone whatever state the lookup needs into the future.
///
/// # Example
///
/// ```
/// use sieve_core::lookup::{Lookup, LookupError, LookupFuture};
/// use serde_json::{json, Value};
///
/// struct Users;
///
/// impl Lookup for Users {
///     fn lookup(&self, raw: Value) -> LookupFuture {
///         Box::pin(async move {
///             match raw.as_str() {
///                 Some(id) => Ok(json!({ "id": id, "name": "Ann" })),
///                 None => Err(LookupError::NotFound),
///             }
///         })
///     }
/// }
/// ```
pub trait Lookup: Send + Sync + 'static {
    /// Resolves `raw` into its replacement value.
    fn lookup(&self, raw: Value) -> LookupFuture;
}

/// A [`Lookup`] backed by an async closure.
///
/// ```
/// use sieve_core::lookup::{FnLookup, LookupError};
/// use serde_json::{json, Value};
///
/// let users = FnLookup::new(|raw: Value| async move {
///     Ok::<_, LookupError>(json!({ "id": raw }))
/// });
/// # let _ = users;
/// ```
pub struct FnLookup<F> {
    f: F,
}

impl<F> FnLookup<F> {
    /// Wraps a closure returning a lookup future.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> Lookup for FnLookup<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, LookupError>> + Send + 'static,
{
    fn lookup(&self, raw: Value) -> LookupFuture {
        Box::pin((self.f)(raw))
    }
}

impl<F> std::fmt::Debug for FnLookup<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLookup").finish_non_exhaustive()
    }
}

/// Why a lookup could not produce a replacement.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The referenced entity does not exist.
    #[error("referenced entity not found")]
    NotFound,

    /// The lookup did not settle within the configured timeout.
    #[error("lookup timed out")]
    TimedOut,

    /// The lookup task panicked.
    #[error("lookup panicked")]
    Panicked,

    /// Any other failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LookupError {
    /// Short label used as the `outcome` metric label.
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::TimedOut => "timed_out",
            Self::Panicked => "panicked",
            Self::Other(_) => "error",
        }
    }
}

/// Rule deciding whether a body field counts as present for lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// Present unless `null`, `false`, `0` or `""`.
    #[default]
    Truthy,
    /// Present unless `null`.
    NonNull,
}

impl Presence {
    /// Returns whether `value` counts as present.
    #[must_use]
    pub fn is_present(self, value: &Value) -> bool {
        match self {
            Self::NonNull => !value.is_null(),
            Self::Truthy => match value {
                Value::Null => false,
                Value::Bool(b) => *b,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                Value::String(s) => !s.is_empty(),
                Value::Array(_) | Value::Object(_) => true,
            },
        }
    }
}
