//! Deployment environment.
//!
//! The error formatter decides whether to expose diagnostic stacks based on
//! the environment the process runs in. The check is an exact, case-sensitive
//! comparison against the literal `production`.

use serde::{Deserialize, Serialize};

/// Environment variable consulted when no configuration is supplied.
pub const ENVIRONMENT_VAR: &str = "SIEVE_ENV";

/// The environment a process is deployed to.
///
/// # Example
///
/// ```
/// use sieve_core::Environment;
///
/// assert!(Environment::parse("production").is_production());
/// assert!(!Environment::parse("Production").is_production());
/// assert!(!Environment::parse("staging").is_production());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Environment {
    /// `production`.
    Production,
    /// `development`.
    #[default]
    Development,
    /// `test`.
    Test,
    /// Any other label, kept verbatim.
    Other(String),
}

impl Environment {
    /// Parses an environment label.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "production" => Self::Production,
            "development" => Self::Development,
            "test" => Self::Test,
            other => Self::Other(other.to_string()),
        }
    }

    /// Reads the environment from [`ENVIRONMENT_VAR`].
    ///
    /// An unset or non-unicode variable yields [`Environment::Development`].
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(ENVIRONMENT_VAR).map_or(Self::Development, |v| Self::parse(&v))
    }

    /// Returns `true` only for the exact label `production`.
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Returns the environment label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Test => "test",
            Self::Other(label) => label,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Environment {
    fn from(label: String) -> Self {
        Self::parse(&label)
    }
}

impl From<Environment> for String {
    fn from(env: Environment) -> Self {
        env.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(
            Environment::parse("staging"),
            Environment::Other("staging".to_string())
        );
    }

    #[test]
    fn test_production_is_exact_match() {
        assert!(Environment::parse("production").is_production());
        assert!(!Environment::parse("PRODUCTION").is_production());
        assert!(!Environment::parse(" production").is_production());
        assert!(!Environment::parse("prod").is_production());
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let json = serde_json::to_string(&Environment::Other("qa".into())).unwrap();
        assert_eq!(json, "\"qa\"");
        let env: Environment = serde_json::from_str("\"production\"").unwrap();
        assert!(env.is_production());
    }
}
