//! Engine configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

fn default_database_path() -> String {
    "hermes.db".to_string()
}

fn default_event_capacity() -> usize {
    256
}

/// Configuration for the session engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Per-tenant event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl CoreConfig {
    /// Load from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("HERMES_DATABASE_PATH") {
            config.database_path = path;
        }
        if let Ok(capacity) = std::env::var("HERMES_EVENT_CAPACITY") {
            config.event_capacity = capacity.parse().map_err(|_| Error::InvalidConfig {
                field: "HERMES_EVENT_CAPACITY".to_string(),
                message: format!("not a valid capacity: {capacity}"),
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the engine at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.is_empty() {
            return Err(Error::InvalidConfig {
                field: "database_path".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidConfig {
                field: "event_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.database_path, "hermes.db");
        assert_eq!(config.event_capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = CoreConfig {
            event_capacity: 0,
            ..CoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { field, .. }) if field == "event_capacity"
        ));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.database_path, "hermes.db");
    }
}
