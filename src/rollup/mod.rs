//! Rollup calculators.
//!
//! Each calculator recomputes one aggregate period from its inputs and
//! upserts the result, so every refresh is idempotent. Pantry monthly and
//! yearly rows are sums of the weekly layer; warehouse and sunshine monthly
//! rows are computed straight from source rows. Pantry weeks and the monthly
//! warehouse and sunshine rows also add back the share of rows removed by
//! earlier purges.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use tracing::debug;

use crate::calendar::month_window;
use crate::interfaces::{RollupStore, StorageError};
use crate::model::AggregationDomain;

pub mod hooks;
pub mod pantry;
pub mod sunshine;
pub mod warehouse;

pub use hooks::SourceChange;
pub use pantry::PantryRollup;
pub use sunshine::SunshineRollup;
pub use warehouse::WarehouseRollup;

/// Result type for rollup operations.
pub type Result<T> = std::result::Result<T, RollupError>;

/// Errors that can occur while refreshing aggregates.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("Invalid period: {year}-{month:02}")]
    InvalidMonth { year: i32, month: u32 },

    #[error("Invalid period: year {0}")]
    InvalidYear(i32),

    #[error("Invalid week {0}: weeks are numbered from 1")]
    InvalidWeek(u32),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reject months outside 1..=12 and years chrono can't represent.
pub(crate) fn validate_month(year: i32, month: u32) -> Result<()> {
    match month_window(year, month) {
        Some(_) => Ok(()),
        None => Err(RollupError::InvalidMonth { year, month }),
    }
}

/// All three calculators over one store.
#[derive(Clone)]
pub struct RollupEngine {
    pantry: PantryRollup,
    warehouse: WarehouseRollup,
    sunshine: SunshineRollup,
}

impl RollupEngine {
    pub fn new(store: Arc<dyn RollupStore>) -> Self {
        Self {
            pantry: PantryRollup::new(Arc::clone(&store)),
            warehouse: WarehouseRollup::new(Arc::clone(&store)),
            sunshine: SunshineRollup::new(store),
        }
    }

    pub fn pantry(&self) -> &PantryRollup {
        &self.pantry
    }

    pub fn warehouse(&self) -> &WarehouseRollup {
        &self.warehouse
    }

    pub fn sunshine(&self) -> &SunshineRollup {
        &self.sunshine
    }

    /// Refresh one month of a domain's monthly aggregate.
    pub async fn refresh_month(
        &self,
        domain: AggregationDomain,
        year: i32,
        month: u32,
    ) -> Result<()> {
        match domain {
            AggregationDomain::Pantry => self.pantry.refresh_month(year, month).await,
            AggregationDomain::Warehouse => self.warehouse.refresh_month(year, month).await,
            AggregationDomain::Sunshine => self.sunshine.refresh_month(year, month).await,
        }
    }

    /// Refresh the monthly aggregate for each month start in `months`.
    ///
    /// Distinct months refresh concurrently. For the pantry domain the yearly
    /// total of every touched year is refreshed once all months are done.
    pub async fn refresh_months(
        &self,
        domain: AggregationDomain,
        months: &BTreeSet<NaiveDate>,
    ) -> Result<()> {
        if months.is_empty() {
            return Ok(());
        }

        debug!(%domain, months = months.len(), "refreshing monthly aggregates");

        try_join_all(
            months
                .iter()
                .map(|month| self.refresh_month(domain, month.year(), month.month())),
        )
        .await?;

        if domain == AggregationDomain::Pantry {
            let years: BTreeSet<i32> = months.iter().map(|month| month.year()).collect();
            for year in years {
                self.pantry.refresh_year(year).await?;
            }
        }

        Ok(())
    }

    /// Bring every aggregate fed by `months` up to date ahead of a purge.
    ///
    /// Pantry weeks touching the months are rebuilt from source first, while
    /// the rows about to be deleted are still present. Other domains refresh
    /// their monthly rows. Returns how many months were refreshed.
    pub async fn refresh_before_purge(
        &self,
        domain: AggregationDomain,
        months: &BTreeSet<NaiveDate>,
    ) -> Result<usize> {
        match domain {
            AggregationDomain::Pantry => Ok(self.pantry.rebuild_months(months).await?.len()),
            AggregationDomain::Warehouse | AggregationDomain::Sunshine => {
                self.refresh_months(domain, months).await?;
                Ok(months.len())
            }
        }
    }
}
