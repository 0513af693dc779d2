//! Pantry weekly, monthly and yearly rollups.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use tracing::debug;

use super::{validate_month, Result, RollupError};
use crate::calendar::{
    month_start, pantry_week, start_of_year, week_containing, weeks_touching_month, PantryWeek,
    MAX_WEEKS_PER_MONTH,
};
use crate::interfaces::RollupStore;
use crate::model::{PantryMonthly, PantryTotals, PantryYearly, WeeklyAggregate};

/// Pantry rollup calculator.
///
/// Weekly rows are computed from client visits and sunshine bags. Monthly and
/// yearly rows only ever sum the weekly layer, so they stay consistent with
/// it even after the underlying source rows are purged.
#[derive(Clone)]
pub struct PantryRollup {
    store: Arc<dyn RollupStore>,
}

impl PantryRollup {
    pub fn new(store: Arc<dyn RollupStore>) -> Self {
        Self { store }
    }

    /// Recompute one pantry week from source rows.
    ///
    /// The share of any rows already purged from the week is added back from
    /// the retained layer. A week whose Monday falls outside the month
    /// doesn't exist; refreshing it writes nothing and succeeds.
    pub async fn refresh_week(&self, year: i32, month: u32, week: u32) -> Result<()> {
        validate_month(year, month)?;
        if week == 0 {
            return Err(RollupError::InvalidWeek(week));
        }

        let Some(pantry_week) = pantry_week(year, month, week) else {
            debug!(year, month, week, "pantry week not in month, skipping");
            return Ok(());
        };

        let window = pantry_week.window();
        let visits = self.store.visit_totals(window).await?;
        let sunshine = self.store.sunshine_totals(window).await?;
        let retained = self.store.retained_week(year, month, week).await?;

        let weekly = WeeklyAggregate {
            year,
            month,
            week,
            start_date: pantry_week.start_date,
            end_date: pantry_week.end_date,
            totals: PantryTotals::from_sources(visits, sunshine) + retained,
        };
        self.store.upsert_weekly(&weekly).await?;

        debug!(
            year,
            month,
            week,
            orders = weekly.totals.orders,
            weight = weekly.totals.weight,
            "pantry week refreshed"
        );
        Ok(())
    }

    /// Sum the month's weekly rows into the monthly aggregate.
    pub async fn refresh_month(&self, year: i32, month: u32) -> Result<()> {
        validate_month(year, month)?;

        let totals = self.store.weekly_sum_for_month(year, month).await?;
        self.store
            .upsert_pantry_monthly(&PantryMonthly {
                year,
                month,
                totals,
            })
            .await?;

        debug!(year, month, orders = totals.orders, "pantry month refreshed");
        Ok(())
    }

    /// Sum the year's weekly rows into the yearly aggregate.
    pub async fn refresh_year(&self, year: i32) -> Result<()> {
        if start_of_year(year).is_none() {
            return Err(RollupError::InvalidYear(year));
        }

        let totals = self.store.weekly_sum_for_year(year).await?;
        self.store
            .upsert_pantry_yearly(&PantryYearly { year, totals })
            .await?;

        debug!(year, orders = totals.orders, "pantry year refreshed");
        Ok(())
    }

    /// Recompute every week of the month from source rows, then the month.
    pub async fn rebuild_month(&self, year: i32, month: u32) -> Result<()> {
        validate_month(year, month)?;
        for week in 1..=MAX_WEEKS_PER_MONTH {
            self.refresh_week(year, month, week).await?;
        }
        self.refresh_month(year, month).await
    }

    /// Recompute from source every week touching `months`, then the months and
    /// years those weeks belong to.
    ///
    /// A week spilling over from the previous month is included, so that
    /// month is refreshed as well. Returns the month starts refreshed.
    pub async fn rebuild_months(
        &self,
        months: &BTreeSet<NaiveDate>,
    ) -> Result<BTreeSet<NaiveDate>> {
        let weeks: BTreeSet<PantryWeek> = months
            .iter()
            .flat_map(|month| weeks_touching_month(month.year(), month.month()))
            .collect();

        try_join_all(
            weeks
                .iter()
                .map(|week| self.refresh_week(week.year, week.month, week.week)),
        )
        .await?;

        let mut touched = months.clone();
        touched.extend(
            weeks
                .iter()
                .filter_map(|week| month_start(week.year, week.month)),
        );

        try_join_all(
            touched
                .iter()
                .map(|month| self.refresh_month(month.year(), month.month())),
        )
        .await?;

        let years: BTreeSet<i32> = touched.iter().map(|month| month.year()).collect();
        for year in years {
            self.refresh_year(year).await?;
        }

        debug!(weeks = weeks.len(), months = touched.len(), "pantry months rebuilt");
        Ok(touched)
    }

    /// Refresh the week, month and year affected by a source row on `date`.
    ///
    /// Weekend dates fall in no pantry week and leave aggregates unchanged.
    pub async fn refresh_for_date(&self, date: NaiveDate) -> Result<()> {
        let Some(week) = week_containing(date) else {
            debug!(%date, "date outside pantry weeks, nothing to refresh");
            return Ok(());
        };

        self.refresh_week(week.year, week.month, week.week).await?;
        self.refresh_month(week.year, week.month).await?;
        self.refresh_year(week.year).await
    }
}
