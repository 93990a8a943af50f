//! Typed configuration for Sieve.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`SIEVE__SECTION__KEY`)
//! - Strict parsing (unknown fields are errors)
//! - Layered loading (defaults → file → env)
//!
//! # Example
//!
//! ```no_run
//! use sieve_config::ConfigLoader;
//!
//! # fn main() -> Result<(), sieve_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_dotenv()?
//!     .with_optional_file("sieve.toml")?
//!     .with_env_prefix("SIEVE")
//!     .load()?;
//!
//! let options = config.validation_options();
//! # let _ = options;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! environment = "production"
//!
//! [validation]
//! abort_early = false
//! strip_unknown = true
//! convert = true
//!
//! [resolution]
//! presence = "truthy"
//! lookup_timeout_ms = 2000
//!
//! [errors]
//! expose_stack = false
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::SieveConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_file_format_parses() {
        let toml = r#"
            environment = "production"

            [validation]
            abort_early = false
            strip_unknown = true
            convert = true

            [resolution]
            presence = "truthy"
            lookup_timeout_ms = 2000

            [errors]
            expose_stack = false

            [logging]
            level = "info"
            format = "json"

            [metrics]
            enabled = true
        "#;

        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.resolution.lookup_timeout_ms, Some(2000));
        assert!(!config.expose_stack());
    }
}
