//! Retention: purging aged source rows without losing their aggregates.

use chrono::NaiveDate;

use crate::interfaces::StorageError;
use crate::rollup::RollupError;

pub mod allow_list;
pub mod purge;
pub mod validation;

pub use allow_list::{domain_of, AllowList, AllowListEntry};
pub use purge::{
    PurgeOrchestrator, PurgePreview, PurgeReport, PurgeRequest, PurgedTable, TablePreview,
};

/// Result type for purge operations.
pub type Result<T> = std::result::Result<T, PurgeError>;

/// Errors that can occur while validating or running a purge.
#[derive(Debug, thiserror::Error)]
pub enum PurgeError {
    #[error("Invalid table name {name:?}: {reason}")]
    InvalidTableName { name: String, reason: String },

    #[error("Table not allowed for purge: {0}")]
    TableNotAllowed(String),

    #[error("No tables requested")]
    NoTables,

    #[error("Cutoff {cutoff} must be before {year_start}")]
    CutoffNotBeforeCurrentYear {
        cutoff: NaiveDate,
        year_start: NaiveDate,
    },

    #[error(transparent)]
    Rollup(#[from] RollupError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
