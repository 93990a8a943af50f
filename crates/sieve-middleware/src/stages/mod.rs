//! Built-in middleware stages.
//!
//! 1. [`error_formatting`] - render errors and panics as JSON
//! 2. [`body`] - parse the JSON request body
//! 3. [`validation`] - validate the body against a route schema
//! 4. [`resolution`] - replace identifiers with looked-up objects

pub mod body;
pub mod error_formatting;
pub mod resolution;
pub mod validation;

pub use body::JsonBodyMiddleware;
pub use error_formatting::{ErrorFormatter, ErrorFormattingMiddleware};
pub use resolution::{Resolution, ResolutionMiddleware, ResolverMap};
pub use validation::{ValidationMiddleware, ValidationOutcome};
