//! Yearly warehouse log cleanup.
//!
//! Once a year has closed, surplus, pig-pound, outgoing donation and sunshine
//! bag rows from before January 1 are folded into their monthly aggregates
//! and deleted. Donations and volunteer data are never touched.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::{JobError, JobOutcome, RecurringJob, Result};
use crate::calendar::{months_of_year, start_of_year};
use crate::interfaces::{PurgePlan, PurgeTarget, RetentionStore};
use crate::model::AggregationDomain;
use crate::retention::domain_of;
use crate::rollup::RollupEngine;
use crate::storage::schema::SourceTable;

/// Logs cleared by this job.
pub const WAREHOUSE_CLEANUP_TABLES: [SourceTable; 4] = [
    SourceTable::SurplusLog,
    SourceTable::PigPoundLog,
    SourceTable::OutgoingDonationLog,
    SourceTable::SunshineBagLog,
];

pub struct WarehouseCleanupJob {
    retention: Arc<dyn RetentionStore>,
    rollups: RollupEngine,
}

impl WarehouseCleanupJob {
    pub fn new(retention: Arc<dyn RetentionStore>, rollups: RollupEngine) -> Self {
        Self { retention, rollups }
    }

    /// January 1 of the current year.
    pub fn cutoff(today: NaiveDate) -> Result<NaiveDate> {
        start_of_year(today.year()).ok_or(JobError::InvalidCutoff(today.year()))
    }
}

#[async_trait]
impl RecurringJob for WarehouseCleanupJob {
    fn name(&self) -> &'static str {
        "warehouse_cleanup"
    }

    async fn is_due(&self, today: NaiveDate) -> Result<bool> {
        let cutoff = Self::cutoff(today)?;
        for table in WAREHOUSE_CLEANUP_TABLES {
            if self
                .retention
                .has_rows_before(PurgeTarget::from(table), cutoff)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn run(&self, today: NaiveDate) -> Result<JobOutcome> {
        let cutoff = Self::cutoff(today)?;
        let prior_year: BTreeSet<NaiveDate> =
            months_of_year(today.year() - 1).into_iter().collect();

        let mut warehouse_months = prior_year.clone();
        let mut sunshine_months = prior_year;

        for table in WAREHOUSE_CLEANUP_TABLES {
            let months = self
                .retention
                .months_before(PurgeTarget::from(table), cutoff)
                .await?;
            debug!(table = table.name(), months = months.len(), "discovered months");
            match domain_of(table) {
                Some(AggregationDomain::Sunshine) => sunshine_months.extend(months),
                _ => warehouse_months.extend(months),
            }
        }

        let months_refreshed = self
            .rollups
            .refresh_before_purge(AggregationDomain::Warehouse, &warehouse_months)
            .await?
            + self
                .rollups
                .refresh_before_purge(AggregationDomain::Sunshine, &sunshine_months)
                .await?;

        let plan = PurgePlan {
            cutoff,
            targets: WAREHOUSE_CLEANUP_TABLES
                .into_iter()
                .map(PurgeTarget::from)
                .collect(),
        };
        let deleted = self.retention.purge(&plan).await?;

        Ok(JobOutcome {
            cutoff,
            months_refreshed,
            rows_deleted: deleted.iter().sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_is_start_of_current_year() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 4).unwrap();
        assert_eq!(
            WarehouseCleanupJob::cutoff(today).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_cleanup_never_touches_donations() {
        assert!(!WAREHOUSE_CLEANUP_TABLES.contains(&SourceTable::Donations));
        assert!(!WAREHOUSE_CLEANUP_TABLES.contains(&SourceTable::VolunteerBookings));
    }
}
