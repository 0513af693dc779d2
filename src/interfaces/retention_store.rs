//! Retention storage interface.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::rollup_store::Result;
use crate::model::VolunteerArchive;
use crate::storage::schema::{DateColumn, SourceTable};

/// A source table and the column its cutoff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurgeTarget {
    pub table: SourceTable,
    pub date_column: DateColumn,
}

impl From<SourceTable> for PurgeTarget {
    fn from(table: SourceTable) -> Self {
        Self {
            table,
            date_column: table.date_column(),
        }
    }
}

/// The deletion phase of a purge, executed as one transaction.
///
/// Before any row is deleted its contribution is folded away: volunteer
/// bookings into the archive, aggregate-feeding rows into the retained
/// tables that later refreshes add back.
#[derive(Debug, Clone)]
pub struct PurgePlan {
    /// Rows dated strictly before this are deleted.
    pub cutoff: NaiveDate,
    pub targets: Vec<PurgeTarget>,
}

/// Interface for discovering and deleting aged source rows.
///
/// Implementations:
/// - `SqliteRetentionStore`: SQLite storage
#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Distinct month starts among rows dated before `cutoff`, ascending.
    async fn months_before(&self, target: PurgeTarget, cutoff: NaiveDate)
        -> Result<Vec<NaiveDate>>;

    /// Whether any row is dated before `cutoff`.
    async fn has_rows_before(&self, target: PurgeTarget, cutoff: NaiveDate) -> Result<bool>;

    /// Execute the plan atomically.
    ///
    /// Returns the number of deleted rows per target, in plan order. On error
    /// nothing is deleted and neither the archive nor the retained tables
    /// change.
    async fn purge(&self, plan: &PurgePlan) -> Result<Vec<u64>>;

    /// Reclaim storage freed by deletions from `tables`.
    async fn reclaim_storage(&self, tables: &[SourceTable]) -> Result<()>;

    /// Archived counters for one volunteer.
    async fn volunteer_archive(&self, volunteer_id: i64) -> Result<Option<VolunteerArchive>>;
}
