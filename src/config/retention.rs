//! Retention and scheduler configuration.

use serde::Deserialize;

use super::ConfigError;
use crate::retention::validation::normalize_table_name;
use crate::storage::schema::SourceTable;

/// Retention policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Whole years of client visits and bookings kept before the current
    /// year. Must be at least 1.
    pub pantry_retention_years: u32,
    /// Tables the purge orchestrator may touch. Every name must be a known
    /// source table after trimming and lowercasing; an empty list disables
    /// purging.
    pub purge_tables: Vec<String>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            pantry_retention_years: 1,
            purge_tables: SourceTable::ALL
                .iter()
                .map(|table| table.name().to_string())
                .collect(),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pantry_retention_years == 0 {
            return Err(ConfigError::Invalid(
                "retention.pantry_retention_years must be at least 1".into(),
            ));
        }
        for name in &self.purge_tables {
            if SourceTable::from_name(&normalize_table_name(name)).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "retention.purge_tables: unknown table {name:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Background job scheduling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between warehouse cleanup guard checks.
    pub warehouse_check_interval_secs: u64,
    /// Seconds between pantry retention guard checks.
    pub pantry_check_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warehouse_check_interval_secs: 3600,
            pantry_check_interval_secs: 3600,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.warehouse_check_interval_secs == 0 || self.pantry_check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "scheduler check intervals must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retention_default_allows_every_table() {
        let config = RetentionConfig::default();
        assert_eq!(config.pantry_retention_years, 1);
        assert_eq!(config.purge_tables.len(), SourceTable::ALL.len());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retention_rejects_zero_years() {
        let config = RetentionConfig {
            pantry_retention_years: 0,
            ..RetentionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retention_rejects_unknown_table() {
        let config = RetentionConfig {
            purge_tables: vec!["donations".into(), "donors".into()],
            ..RetentionConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("donors"));
    }

    #[test]
    fn test_retention_accepts_names_the_allow_list_accepts() {
        let config = RetentionConfig {
            purge_tables: vec![" Surplus_Log".into(), "DONATIONS ".into()],
            ..RetentionConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(crate::retention::AllowList::from_names(&config.purge_tables).is_ok());
    }

    #[test]
    fn test_scheduler_rejects_zero_interval() {
        let config = SchedulerConfig {
            pantry_check_interval_secs: 0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
