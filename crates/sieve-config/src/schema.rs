//! Configuration section types.

use serde::{Deserialize, Serialize};
use sieve_core::{Presence, ValidationOptions};
use sieve_telemetry::{LogConfig, LogFormat, MetricsConfig};
use std::time::Duration;

/// Schema validation defaults applied to every route.
///
/// # Example
///
/// ```
/// use sieve_config::ValidationSection;
///
/// let section = ValidationSection::default();
/// assert!(!section.abort_early);
/// assert!(section.strip_unknown);
/// assert!(section.convert);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ValidationSection {
    /// Stop at the first error instead of collecting all of them.
    #[serde(default)]
    pub abort_early: bool,

    /// Strip unknown object keys. When `false` they are rejected.
    #[serde(default = "default_true")]
    pub strip_unknown: bool,

    /// Coerce numeric and boolean strings.
    #[serde(default = "default_true")]
    pub convert: bool,
}

impl Default for ValidationSection {
    fn default() -> Self {
        Self {
            abort_early: false,
            strip_unknown: true,
            convert: true,
        }
    }
}

impl ValidationSection {
    /// Returns the engine options for this section.
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        ValidationOptions {
            abort_early: self.abort_early,
            strip_unknown: self.strip_unknown,
            convert: self.convert,
        }
    }
}

/// External reference resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ResolutionSection {
    /// Which body values count as present and get looked up.
    #[serde(default)]
    pub presence: Presence,

    /// Per-lookup timeout in milliseconds. Unset waits indefinitely.
    #[serde(default)]
    pub lookup_timeout_ms: Option<u64>,
}

impl ResolutionSection {
    /// Returns the per-lookup timeout, if any.
    #[must_use]
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_ms.map(Duration::from_millis)
    }
}

/// Error response formatting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ErrorsSection {
    /// Forces the diagnostic stack on or off, regardless of environment.
    #[serde(default)]
    pub expose_stack: Option<bool>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. `info`, `sieve_middleware=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include file and line in log lines.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            include_location: false,
        }
    }
}

impl From<&LoggingSection> for LogConfig {
    fn from(section: &LoggingSection) -> Self {
        Self {
            enabled: section.enabled,
            level: section.level.clone(),
            format: section.format,
            file_line_info: section.include_location,
            include_target: true,
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Install the Prometheus recorder.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl From<&MetricsSection> for MetricsConfig {
    fn from(section: &MetricsSection) -> Self {
        Self {
            enabled: section.enabled,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_section_options() {
        let section = ValidationSection {
            abort_early: true,
            ..Default::default()
        };
        let options = section.options();
        assert!(options.abort_early);
        assert!(options.strip_unknown);
    }

    #[test]
    fn test_resolution_section_parsing() {
        let section: ResolutionSection =
            toml::from_str("presence = \"non_null\"\nlookup_timeout_ms = 250").unwrap();
        assert_eq!(section.presence, Presence::NonNull);
        assert_eq!(section.lookup_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_resolution_section_rejects_unknown_fields() {
        let result: Result<ResolutionSection, _> = toml::from_str("retries = 3");
        assert!(result.is_err());
    }

    #[test]
    fn test_logging_section_into_log_config() {
        let section = LoggingSection {
            format: LogFormat::Pretty,
            include_location: true,
            ..Default::default()
        };
        let config = LogConfig::from(&section);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.file_line_info);
    }
}
