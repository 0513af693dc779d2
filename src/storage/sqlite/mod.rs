//! SQLite implementations of storage interfaces.

mod retention_store;
mod rollup_store;

pub use retention_store::SqliteRetentionStore;
pub use rollup_store::SqliteRollupStore;

use sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::interfaces::rollup_store::{Result, StorageError};

/// `COALESCE(SUM(col), 0)`, so empty windows sum to zero instead of NULL.
pub(crate) fn coalesce_sum<C>(col: C) -> SimpleExpr
where
    C: IntoColumnRef,
{
    Func::coalesce([Expr::col(col).sum(), Expr::val(0).into()]).into()
}

/// Read the `year` and `month` columns of an aggregate row.
pub(crate) fn month_from_row(row: &SqliteRow) -> Result<(i32, u32)> {
    let year: i64 = row.try_get("year")?;
    let month: i64 = row.try_get("month")?;
    let year =
        i32::try_from(year).map_err(|_| StorageError::OutOfRange(format!("year {year}")))?;
    let month =
        u32::try_from(month).map_err(|_| StorageError::OutOfRange(format!("month {month}")))?;
    Ok((year, month))
}
