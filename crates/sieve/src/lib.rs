//! # Sieve
//!
//! **Request body validation and reference resolution for HTTP services**
//!
//! Sieve is a small per-request pipeline that:
//!
//! - validates JSON bodies against declared schemas, coercing values and
//!   stripping unknown keys, with submitted values redacted from every error
//! - replaces identifiers embedded in bodies with objects looked up
//!   concurrently, then re-validates the runtime shape of what came back
//! - renders every uncaught error as JSON, hiding diagnostic stacks in
//!   production
//!
//! ## Quick Start
//!
//! ```no_run
//! use sieve::prelude::*;
//! use serde_json::{json, Value};
//!
//! # async fn run(request: Request) -> Result<(), SetupError> {
//! let config = ConfigLoader::new().with_env_prefix("SIEVE").load()?;
//! sieve::bootstrap(&config)?;
//!
//! let users = ResolverMap::new().with_fn("author", |id: Value| async move {
//!     Ok::<_, LookupError>(json!({ "id": id, "name": "Ann" }))
//! });
//!
//! let pipeline = Pipeline::builder()
//!     .resolve(sieve::resolution(users, &config))
//!     .validate(sieve::validation(
//!         Schema::object(vec![
//!             ("title", Schema::string().min_length(1).required()),
//!             ("author", Schema::open_object().required()),
//!         ]),
//!         &config,
//!     ))
//!     .build();
//!
//! let response = pipeline
//!     .process(request, |ctx, _req| {
//!         let post = ctx.body().clone();
//!         Box::pin(async move { Ok(Response::json(http::StatusCode::CREATED, &post)) })
//!     })
//!     .await;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → ErrorFormatting → JsonBody → Resolution → Validation → Handler
//! ```

#![doc(html_root_url = "https://docs.rs/sieve/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use sieve_config::{ConfigError, SieveConfig};
use sieve_core::Schema;
use sieve_middleware::stages::{
    error_formatting, ErrorFormatter, ResolutionMiddleware, ResolverMap, ValidationMiddleware,
};
use sieve_telemetry::{LogConfig, MetricsConfig, TelemetryError};
use thiserror::Error;

pub use sieve_config as config;
pub use sieve_core as core;
pub use sieve_middleware as middleware;
pub use sieve_telemetry as telemetry;

/// Errors raised while setting up the process.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be initialized.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// An error formatter was already installed for this process.
    #[error("error formatter already installed")]
    FormatterInstalled,
}

/// Returns the error formatter described by `config`.
#[must_use]
pub fn formatter(config: &SieveConfig) -> ErrorFormatter {
    ErrorFormatter::new(config.expose_stack())
}

/// Initializes the process from `config`: the process-wide error formatter,
/// then logging and metrics.
///
/// Call once at startup, before building pipelines. A second call fails
/// before touching telemetry.
///
/// # Errors
///
/// Returns `SetupError` if the configuration is invalid, a formatter was
/// already installed, or telemetry fails to initialize.
pub fn bootstrap(config: &SieveConfig) -> Result<(), SetupError> {
    config.validate()?;

    let formatter = formatter(config);
    error_formatting::install(formatter).map_err(|_| SetupError::FormatterInstalled)?;

    sieve_telemetry::init_telemetry(
        &LogConfig::from(&config.logging),
        &MetricsConfig::from(&config.metrics),
    )?;

    tracing::info!(
        environment = %config.environment,
        expose_stack = formatter.expose_stack(),
        "sieve initialized"
    );
    Ok(())
}

/// Builds a validation stage using the configured options.
#[must_use]
pub fn validation(schema: Schema, config: &SieveConfig) -> ValidationMiddleware {
    ValidationMiddleware::new(schema).options(config.validation_options())
}

/// Builds a resolution stage using the configured presence rule, timeout and
/// validation options.
#[must_use]
pub fn resolution(resolvers: ResolverMap, config: &SieveConfig) -> ResolutionMiddleware {
    let stage = ResolutionMiddleware::new(resolvers)
        .presence(config.resolution.presence)
        .options(config.validation_options());
    match config.resolution.lookup_timeout() {
        Some(timeout) => stage.lookup_timeout(timeout),
        None => stage,
    }
}

/// Prelude module for convenient imports.
///
/// ```
/// use sieve::prelude::*;
///
/// let schema = Schema::object(vec![("title", Schema::string().required())]);
/// # let _ = schema;
/// ```
pub mod prelude {
    pub use crate::SetupError;

    pub use sieve_config::{ConfigError, ConfigLoader, SieveConfig};

    pub use sieve_core::{
        Environment, ErrorBody, FnLookup, Lookup, LookupError, Presence, Schema, SieveError,
        SieveResult, UnknownKeys, ValidationOptions, ValidationReport,
    };

    pub use sieve_middleware::stages::{
        ErrorFormatter, ResolutionMiddleware, ResolverMap, ValidationMiddleware,
    };
    pub use sieve_middleware::{
        Middleware, MiddlewareContext, Next, Pipeline, Request, Response, ResponseExt,
    };
}
