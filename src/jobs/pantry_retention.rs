//! Pantry visit and booking retention.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use super::{JobError, JobOutcome, RecurringJob, Result};
use crate::calendar::{months_of_year, start_of_year};
use crate::interfaces::{PurgePlan, PurgeTarget, RetentionStore};
use crate::model::AggregationDomain;
use crate::rollup::RollupEngine;
use crate::storage::schema::SourceTable;

const PANTRY_RETENTION_TABLES: [SourceTable; 2] =
    [SourceTable::ClientVisits, SourceTable::Bookings];

/// Deletes client visits and bookings older than the retention window.
///
/// With `retention_years = N` the cutoff is January 1 of the year N years
/// before the current one.
pub struct PantryRetentionJob {
    retention: Arc<dyn RetentionStore>,
    rollups: RollupEngine,
    retention_years: u32,
}

impl PantryRetentionJob {
    pub fn new(
        retention: Arc<dyn RetentionStore>,
        rollups: RollupEngine,
        retention_years: u32,
    ) -> Result<Self> {
        if retention_years == 0 {
            return Err(JobError::InvalidRetentionYears(retention_years));
        }
        Ok(Self {
            retention,
            rollups,
            retention_years,
        })
    }

    pub fn cutoff(&self, today: NaiveDate) -> Result<NaiveDate> {
        let years = i32::try_from(self.retention_years)
            .map_err(|_| JobError::InvalidRetentionYears(self.retention_years))?;
        let year = today.year() - years;
        start_of_year(year).ok_or(JobError::InvalidCutoff(year))
    }
}

#[async_trait]
impl RecurringJob for PantryRetentionJob {
    fn name(&self) -> &'static str {
        "pantry_retention"
    }

    async fn is_due(&self, today: NaiveDate) -> Result<bool> {
        let cutoff = self.cutoff(today)?;
        for table in PANTRY_RETENTION_TABLES {
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
        let cutoff = self.cutoff(today)?;

        let mut months: BTreeSet<NaiveDate> =
            months_of_year(today.year() - 1).into_iter().collect();
        months.extend(
            self.retention
                .months_before(PurgeTarget::from(SourceTable::ClientVisits), cutoff)
                .await?,
        );

        let months_refreshed = self
            .rollups
            .refresh_before_purge(AggregationDomain::Pantry, &months)
            .await?;

        let plan = PurgePlan {
            cutoff,
            targets: PANTRY_RETENTION_TABLES
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
