//! Warehouse monthly rollup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{Result, RollupError};
use crate::calendar::{month_window, DateWindow};
use crate::interfaces::RollupStore;
use crate::model::{DonorMonthly, DonorTotals, WarehouseMonthly};
use crate::storage::schema::SourceTable;

/// Warehouse rollup calculator.
#[derive(Clone)]
pub struct WarehouseRollup {
    store: Arc<dyn RollupStore>,
}

impl WarehouseRollup {
    pub fn new(store: Arc<dyn RollupStore>) -> Self {
        Self { store }
    }

    /// Recompute the warehouse month and its per-donor breakdown.
    ///
    /// The monthly donation and pet-food totals are summed from the same
    /// per-donor rows that get stored, so they always agree. Donations land in
    /// the pet-food bucket according to the donor's flag at refresh time,
    /// including weight retained from purged donations.
    pub async fn refresh_month(&self, year: i32, month: u32) -> Result<()> {
        let window = month_window(year, month).ok_or(RollupError::InvalidMonth { year, month })?;

        let mut donor_totals: BTreeMap<i64, DonorTotals> = BTreeMap::new();
        let source = self.store.donor_totals(window).await?;
        let retained = self.store.retained_donor_totals(year, month).await?;
        for totals in source.into_iter().chain(retained) {
            let entry = donor_totals.entry(totals.donor_id).or_insert(DonorTotals {
                donor_id: totals.donor_id,
                ..DonorTotals::default()
            });
            entry.donations += totals.donations;
            entry.pet_food += totals.pet_food;
        }

        let surplus = self
            .log_weight(SourceTable::SurplusLog, window, year, month)
            .await?;
        let pig_pound = self
            .log_weight(SourceTable::PigPoundLog, window, year, month)
            .await?;
        let outgoing_donations = self
            .log_weight(SourceTable::OutgoingDonationLog, window, year, month)
            .await?;

        let donors: Vec<DonorMonthly> = donor_totals
            .into_values()
            .map(|totals| DonorMonthly {
                year,
                month,
                donor_id: totals.donor_id,
                donations: totals.donations,
                pet_food: totals.pet_food,
            })
            .collect();

        let monthly = WarehouseMonthly {
            year,
            month,
            donations: donors.iter().map(|d| d.donations).sum(),
            pet_food: donors.iter().map(|d| d.pet_food).sum(),
            surplus,
            pig_pound,
            outgoing_donations,
        };

        self.store.replace_warehouse_month(&monthly, &donors).await?;

        debug!(
            year,
            month,
            donors = donors.len(),
            donations = monthly.donations,
            pet_food = monthly.pet_food,
            "warehouse month refreshed"
        );
        Ok(())
    }

    /// A log's weight for the month: remaining rows plus the purged share.
    async fn log_weight(
        &self,
        table: SourceTable,
        window: DateWindow,
        year: i32,
        month: u32,
    ) -> Result<i64> {
        let source = self.store.weight_total(table, window).await?;
        let retained = self.store.retained_weight(table, year, month).await?;
        Ok(source + retained)
    }
}
