//! Storage configuration types.

use serde::Deserialize;

use super::ConfigError;

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Maximum pool connections. Forced to 1 for in-memory databases.
    pub max_connections: u32,
    /// How long a connection waits on a locked database.
    pub busy_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "./data/foodbank.db".to_string(),
            max_connections: 5,
            busy_timeout_secs: 5,
        }
    }
}

impl StorageConfig {
    /// In-memory configuration for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            path: crate::storage::MEMORY_PATH.to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.path cannot be empty".into()));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "storage.max_connections must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let storage = StorageConfig::default();
        assert_eq!(storage.path, "./data/foodbank.db");
        assert_eq!(storage.max_connections, 5);
        assert!(storage.validate().is_ok());
    }

    #[test]
    fn test_storage_config_rejects_zero_connections() {
        let storage = StorageConfig {
            max_connections: 0,
            ..StorageConfig::default()
        };
        assert!(storage.validate().is_err());
    }
}
