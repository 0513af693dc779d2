//! Rollup storage interface.

use async_trait::async_trait;

use crate::calendar::DateWindow;
use crate::model::{
    DonorMonthly, DonorTotals, PantryMonthly, PantryTotals, PantryYearly, SunshineMonthly,
    SunshineTotals, VisitTotals, WarehouseMonthly, WeeklyAggregate,
};
use crate::storage::schema::SourceTable;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Table {0} has no weight column")]
    NotAWeightLog(&'static str),

    #[error("Table {0} is not a warehouse weight log")]
    NotAWarehouseLog(&'static str),

    #[error("Stored value out of range: {0}")]
    OutOfRange(String),
}

/// Interface for reading source sums and writing aggregate rows.
///
/// Source reads take half-open date windows. Retained reads return what
/// earlier purges folded away for a period. Aggregate writes are upserts
/// keyed on the aggregate's period and always replace every column.
///
/// Implementations:
/// - `SqliteRollupStore`: SQLite storage
#[async_trait]
pub trait RollupStore: Send + Sync {
    /// Sum client visits in the window.
    async fn visit_totals(&self, window: DateWindow) -> Result<VisitTotals>;

    /// Sum sunshine bag client counts and weights in the window.
    async fn sunshine_totals(&self, window: DateWindow) -> Result<SunshineTotals>;

    /// Per-donor donation weights in the window, split by the donor's
    /// current pet-food flag. Donors without donations are omitted.
    async fn donor_totals(&self, window: DateWindow) -> Result<Vec<DonorTotals>>;

    /// Sum the weight column of a weight-only warehouse log.
    async fn weight_total(&self, table: SourceTable, window: DateWindow) -> Result<i64>;

    /// Purged share of a pantry week, zero when nothing was purged.
    async fn retained_week(&self, year: i32, month: u32, week: u32) -> Result<PantryTotals>;

    /// Purged sunshine bag totals of a month.
    async fn retained_sunshine(&self, year: i32, month: u32) -> Result<SunshineTotals>;

    /// Purged weight of a warehouse log for a month.
    async fn retained_weight(&self, table: SourceTable, year: i32, month: u32) -> Result<i64>;

    /// Purged per-donor donation weights of a month, split by the donor's
    /// current pet-food flag.
    async fn retained_donor_totals(&self, year: i32, month: u32) -> Result<Vec<DonorTotals>>;

    /// Insert or overwrite one weekly row.
    async fn upsert_weekly(&self, weekly: &WeeklyAggregate) -> Result<()>;

    /// Sum every weekly row of a month.
    async fn weekly_sum_for_month(&self, year: i32, month: u32) -> Result<PantryTotals>;

    /// Sum every weekly row of a year.
    async fn weekly_sum_for_year(&self, year: i32) -> Result<PantryTotals>;

    async fn upsert_pantry_monthly(&self, monthly: &PantryMonthly) -> Result<()>;

    async fn upsert_pantry_yearly(&self, yearly: &PantryYearly) -> Result<()>;

    /// Upsert the warehouse month and replace the month's donor rows.
    ///
    /// Both writes happen in one transaction: existing donor rows for the
    /// month are deleted and `donors` inserted in their place.
    async fn replace_warehouse_month(
        &self,
        monthly: &WarehouseMonthly,
        donors: &[DonorMonthly],
    ) -> Result<()>;

    async fn upsert_sunshine_monthly(&self, monthly: &SunshineMonthly) -> Result<()>;

    async fn weekly_for_month(&self, year: i32, month: u32) -> Result<Vec<WeeklyAggregate>>;

    async fn pantry_monthly(&self, year: i32, month: u32) -> Result<Option<PantryMonthly>>;

    async fn pantry_yearly(&self, year: i32) -> Result<Option<PantryYearly>>;

    async fn warehouse_monthly(&self, year: i32, month: u32) -> Result<Option<WarehouseMonthly>>;

    async fn donor_monthly(&self, year: i32, month: u32) -> Result<Vec<DonorMonthly>>;

    async fn sunshine_monthly(&self, year: i32, month: u32) -> Result<Option<SunshineMonthly>>;
}
