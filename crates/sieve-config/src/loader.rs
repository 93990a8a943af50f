//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for loading configuration from
//! multiple sources: defaults, files, and environment variables.

use std::env;
use std::fs;
use std::path::Path;

use sieve_core::{Environment, Presence, ENVIRONMENT_VAR};
use sieve_telemetry::LogFormat;

use crate::{ConfigError, SieveConfig};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. `SIEVE_ENV`, the process-wide environment flag
/// 4. Environment variables `PREFIX__SECTION__KEY`
///
/// Layers 3 and 4 apply only when an environment prefix is set.
///
/// # Example
///
/// ```no_run
/// use sieve_config::ConfigLoader;
///
/// # fn main() -> Result<(), sieve_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_defaults()
///     .with_optional_file("sieve.toml")?
///     .with_env_prefix("SIEVE")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: SieveConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SieveConfig::default(),
            env_prefix: None,
        }
    }

    /// Start with default configuration values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = SieveConfig::default();
        self
    }

    /// Start with the development preset.
    ///
    /// ```
    /// use sieve_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = SieveConfig::development();
        self
    }

    /// Start with the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = SieveConfig::production();
        self
    }

    /// Load configuration from a file.
    ///
    /// The format is chosen by extension: `.toml` or `.json`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The file does not exist
    /// - The file cannot be read
    /// - The file contains invalid TOML/JSON
    /// - The file contains unknown fields
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Load configuration from a file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in `toml` or `json` format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use sieve_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     environment = "production"
    ///
    ///     [resolution]
    ///     lookup_timeout_ms = 500
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(config.environment.is_production());
    /// assert_eq!(config.resolution.lookup_timeout_ms, Some(500));
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Set environment variable prefix for overrides.
    ///
    /// `SIEVE_ENV` is read first, so the formatter and the configuration
    /// agree on the environment. With prefix `SIEVE`:
    /// - `SIEVE__ENVIRONMENT=production`
    /// - `SIEVE__RESOLUTION__LOOKUP_TIMEOUT_MS=250`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load a `.env` file into the process environment, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidConfig` if a `.env` file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::InvalidConfig {
                message: format!(".env: {e}"),
            }),
        }
    }

    /// Apply environment overrides, validate, and return the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation fails.
    pub fn load(mut self) -> Result<SieveConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.seed_environment(env::var(ENVIRONMENT_VAR).ok().as_deref());
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalize without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> SieveConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<SieveConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn seed_environment(&mut self, label: Option<&str>) {
        if let Some(label) = label {
            self.config.environment = Environment::parse(label);
        }
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let scoped = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&scoped)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }

        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let key_without_prefix = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ENVIRONMENT"] => {
                config.environment = Environment::parse(value);
            }

            ["VALIDATION", "ABORT_EARLY"] => {
                config.validation.abort_early = bool_var(key, value)?;
            }
            ["VALIDATION", "STRIP_UNKNOWN"] => {
                config.validation.strip_unknown = bool_var(key, value)?;
            }
            ["VALIDATION", "CONVERT"] => {
                config.validation.convert = bool_var(key, value)?;
            }

            ["RESOLUTION", "PRESENCE"] => {
                config.resolution.presence = match value.to_lowercase().as_str() {
                    "truthy" => Presence::Truthy,
                    "non_null" => Presence::NonNull,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'truthy' or 'non_null'",
                        ))
                    }
                };
            }
            ["RESOLUTION", "LOOKUP_TIMEOUT_MS"] => {
                config.resolution.lookup_timeout_ms = if value.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(value.parse().map_err(|_| {
                        ConfigError::env_parse_error(key, "expected integer or 'none'")
                    })?)
                };
            }

            ["ERRORS", "EXPOSE_STACK"] => {
                config.errors.expose_stack = if value.eq_ignore_ascii_case("auto") {
                    None
                } else {
                    Some(bool_var(key, value)?)
                };
            }

            ["LOGGING", "ENABLED"] => {
                config.logging.enabled = bool_var(key, value)?;
            }
            ["LOGGING", "LEVEL"] => {
                config.logging.level = value.to_string();
            }
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = bool_var(key, value)?;
            }

            ["METRICS", "ENABLED"] => {
                config.metrics.enabled = bool_var(key, value)?;
            }

            _ => {
                return Err(ConfigError::unknown_field(
                    key_without_prefix.to_lowercase().replace("__", "."),
                    "environment",
                ))
            }
        }

        Ok(())
    }
}

fn bool_var(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().with_defaults().load().unwrap();
        assert_eq!(config, SieveConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"validation": {"abort_early": true}, "errors": {"expose_stack": false}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert!(config.validation.abort_early);
        assert!(config.validation.strip_unknown);
        assert!(!config.expose_stack());
    }

    #[test]
    fn test_loader_rejects_unknown_fields() {
        let result = ConfigLoader::new().with_string("[server]\nhttp_addr = \"x\"", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_rejects_unknown_format() {
        assert!(ConfigLoader::new().with_string("", "yaml").is_err());
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            environment = "production"

            [resolution]
            presence = "non_null"
            lookup_timeout_ms = 750

            [logging]
            level = "sieve_middleware=debug,info"
            "#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert!(config.environment.is_production());
        assert_eq!(config.resolution.presence, Presence::NonNull);
        assert_eq!(config.resolution.lookup_timeout_ms, Some(750));
        assert_eq!(config.logging.level, "sieve_middleware=debug,info");
    }

    #[test]
    fn test_loader_with_unsupported_file_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let result = ConfigLoader::new().with_file("/nonexistent/sieve.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/sieve.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, SieveConfig::default());
    }

    #[test]
    fn test_load_validates() {
        let result = ConfigLoader::new()
            .with_string("[resolution]\nlookup_timeout_ms = 0", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("on"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_apply_env_var_environment() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__ENVIRONMENT", "production", "TEST")
            .unwrap();
        assert!(loader.config.environment.is_production());
    }

    #[test]
    fn test_environment_flag_seeds_environment() {
        let mut loader = ConfigLoader::new();
        loader.seed_environment(Some("production"));
        assert!(loader.config.environment.is_production());
        assert!(!loader.config.expose_stack());

        loader.seed_environment(None);
        assert!(loader.config.environment.is_production());
    }

    #[test]
    fn test_prefixed_override_beats_environment_flag() {
        let mut loader = ConfigLoader::new();
        loader.seed_environment(Some("production"));
        loader
            .apply_env_var("TEST__ENVIRONMENT", "development", "TEST")
            .unwrap();
        assert!(!loader.config.environment.is_production());
    }

    #[test]
    fn test_apply_env_var_resolution() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__RESOLUTION__PRESENCE", "non_null", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__RESOLUTION__LOOKUP_TIMEOUT_MS", "100", "TEST")
            .unwrap();
        assert_eq!(loader.config.resolution.presence, Presence::NonNull);
        assert_eq!(loader.config.resolution.lookup_timeout_ms, Some(100));

        loader
            .apply_env_var("TEST__RESOLUTION__LOOKUP_TIMEOUT_MS", "none", "TEST")
            .unwrap();
        assert_eq!(loader.config.resolution.lookup_timeout_ms, None);
    }

    #[test]
    fn test_apply_env_var_expose_stack() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__ERRORS__EXPOSE_STACK", "yes", "TEST")
            .unwrap();
        assert_eq!(loader.config.errors.expose_stack, Some(true));
        loader
            .apply_env_var("TEST__ERRORS__EXPOSE_STACK", "auto", "TEST")
            .unwrap();
        assert_eq!(loader.config.errors.expose_stack, None);
    }

    #[test]
    fn test_apply_env_var_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("TEST__VALIDATION__CONVERT", "sometimes", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__LOGGING__FORMAT", "xml", "TEST")
            .is_err());
        assert!(matches!(
            loader.apply_env_var("TEST__SERVER__PORT", "80", "TEST"),
            Err(ConfigError::UnknownField { .. })
        ));
    }
}
