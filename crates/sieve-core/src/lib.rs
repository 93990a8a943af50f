//! # Sieve Core
//!
//! Core types for the Sieve request-processing stage.
//!
//! This crate provides the foundational types used throughout Sieve:
//!
//! - [`Schema`] - Declarative payload shape with a collecting, coercing validator
//! - [`FieldError`] / [`ValidationReport`] - Redactable field-level error descriptors
//! - [`SieveError`] - Standard error taxonomy with HTTP status mapping
//! - [`Lookup`] - Async capability resolving an identifier into a full object
//! - [`Environment`] - Deployment environment consulted by the error formatter
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/sieve-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod environment;
mod error;
pub mod lookup;
pub mod schema;

pub use context::RequestId;
pub use environment::{Environment, ENVIRONMENT_VAR};
pub use error::{ErrorBody, ErrorCategory, SieveError, SieveResult};
pub use lookup::{FnLookup, Lookup, LookupError, LookupFuture, Presence};
pub use schema::{
    ErrorContext, FieldError, PathSegment, Schema, SchemaError, UnknownKeys, ValidationOptions,
    ValidationReport,
};
