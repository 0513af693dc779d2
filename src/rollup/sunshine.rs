//! Sunshine bag monthly rollup.

use std::sync::Arc;

use tracing::debug;

use super::{Result, RollupError};
use crate::calendar::month_window;
use crate::interfaces::RollupStore;
use crate::model::{SunshineMonthly, SunshineTotals};

#[derive(Clone)]
pub struct SunshineRollup {
    store: Arc<dyn RollupStore>,
}

impl SunshineRollup {
    pub fn new(store: Arc<dyn RollupStore>) -> Self {
        Self { store }
    }

    /// Sum the month's bags, plus whatever earlier purges retained.
    pub async fn refresh_month(&self, year: i32, month: u32) -> Result<()> {
        let window = month_window(year, month).ok_or(RollupError::InvalidMonth { year, month })?;

        let source = self.store.sunshine_totals(window).await?;
        let retained = self.store.retained_sunshine(year, month).await?;
        let totals = SunshineTotals {
            orders: source.orders + retained.orders,
            weight: source.weight + retained.weight,
        };
        self.store
            .upsert_sunshine_monthly(&SunshineMonthly {
                year,
                month,
                totals,
            })
            .await?;

        debug!(year, month, orders = totals.orders, "sunshine month refreshed");
        Ok(())
    }
}
