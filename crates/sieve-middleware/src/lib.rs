//! # Sieve Middleware
//!
//! The request pipeline for Sieve routes.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → ErrorFormatting → JsonBody → Resolution → Validation → Handler
//!                 ↑                                                   │
//! Response ←──────┴───────────────── SieveError / panic ←─────────────┘
//! ```
//!
//! | Stage | Middleware       | Purpose                                       |
//! |-------|------------------|-----------------------------------------------|
//! | 1     | Error formatting | Render errors and panics as JSON              |
//! | 2     | JSON body        | Parse the body into the context               |
//! | 3     | Resolution       | Look up identifiers concurrently, re-validate |
//! | 4     | Validation       | Coerce and strip the body, 400 on violations  |
//!
//! Validation and resolution are optional per route.
//!
//! ## Example
//!
//! ```
//! use sieve_middleware::pipeline::{Pipeline, Stage};
//!
//! let stages = Stage::all();
//! assert_eq!(stages[0].name(), "error_formatting");
//! assert_eq!(stages[2].name(), "resolution");
//!
//! let pipeline = Pipeline::builder().build();
//! assert_eq!(pipeline.stage_names(), vec!["error_formatting", "json_body"]);
//! ```

#![doc(html_root_url = "https://docs.rs/sieve-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, FnMiddleware, Handler, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder, Stage};
pub use types::{Request, Response, ResponseExt};
