//! Main configuration type.

use serde::{Deserialize, Serialize};
use sieve_core::{Environment, ValidationOptions};

use crate::{
    ConfigError, ErrorsSection, LoggingSection, MetricsSection, ResolutionSection,
    ValidationSection,
};

/// Complete Sieve configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use sieve_config::SieveConfig;
///
/// let config = SieveConfig::default();
/// assert!(!config.environment.is_production());
/// assert!(config.expose_stack());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct SieveConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Validation defaults.
    #[serde(default)]
    pub validation: ValidationSection,

    /// Reference resolution.
    #[serde(default)]
    pub resolution: ResolutionSection,

    /// Error response formatting.
    #[serde(default)]
    pub errors: ErrorsSection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,

    /// Metrics.
    #[serde(default)]
    pub metrics: MetricsSection,
}

impl SieveConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - the log level is empty
    /// - the lookup timeout is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty",
            ));
        }

        if self.resolution.lookup_timeout_ms == Some(0) {
            return Err(ConfigError::invalid_value(
                "resolution.lookup_timeout_ms",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Returns the route validation options.
    #[must_use]
    pub const fn validation_options(&self) -> ValidationOptions {
        self.validation.options()
    }

    /// Whether error responses carry the diagnostic stack.
    ///
    /// `errors.expose_stack` wins when set; otherwise the stack is shown
    /// everywhere except production.
    #[must_use]
    pub fn expose_stack(&self) -> bool {
        self.errors
            .expose_stack
            .unwrap_or_else(|| !self.environment.is_production())
    }

    /// Development preset: pretty debug logs, stack exposed.
    ///
    /// ```
    /// use sieve_config::SieveConfig;
    ///
    /// let config = SieveConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Development;
        config.logging.level = "debug".to_string();
        config.logging.format = sieve_telemetry::LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logs, stack hidden.
    ///
    /// ```
    /// use sieve_config::SieveConfig;
    ///
    /// let config = SieveConfig::production();
    /// assert!(!config.expose_stack());
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Production;
        config.logging.level = "info".to_string();
        config.logging.format = sieve_telemetry::LogFormat::Json;
        config
    }
}
