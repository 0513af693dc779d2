//! Aggregate maintenance after source writes.
//!
//! Call [`RollupEngine::after_write`] once a source row insert, update or
//! delete has committed. An edit that moves a row across a week, month or
//! year boundary refreshes the periods of both the old and the new date.

use chrono::{Datelike, NaiveDate};
use tracing::debug;

use super::{Result, RollupEngine};
use crate::storage::schema::SourceTable;

/// A committed change to one source row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceChange {
    pub table: SourceTable,
    /// Date before the change; `None` for inserts.
    pub previous: Option<NaiveDate>,
    /// Date after the change; `None` for deletes.
    pub current: Option<NaiveDate>,
}

impl SourceChange {
    pub fn inserted(table: SourceTable, date: NaiveDate) -> Self {
        Self {
            table,
            previous: None,
            current: Some(date),
        }
    }

    pub fn updated(table: SourceTable, previous: NaiveDate, current: NaiveDate) -> Self {
        Self {
            table,
            previous: Some(previous),
            current: Some(current),
        }
    }

    pub fn deleted(table: SourceTable, date: NaiveDate) -> Self {
        Self {
            table,
            previous: Some(date),
            current: None,
        }
    }

    /// Affected dates, without duplicates.
    fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.previous.into_iter().chain(self.current).collect();
        dates.dedup();
        dates
    }
}

impl RollupEngine {
    /// Refresh every aggregate period touched by `change`.
    pub async fn after_write(&self, change: &SourceChange) -> Result<()> {
        for date in change.dates() {
            debug!(table = change.table.name(), %date, "refreshing after source write");

            match change.table {
                SourceTable::ClientVisits => {
                    self.pantry().refresh_for_date(date).await?;
                }
                SourceTable::SunshineBagLog => {
                    self.pantry().refresh_for_date(date).await?;
                    self.sunshine()
                        .refresh_month(date.year(), date.month())
                        .await?;
                }
                SourceTable::Donations
                | SourceTable::SurplusLog
                | SourceTable::PigPoundLog
                | SourceTable::OutgoingDonationLog => {
                    self.warehouse()
                        .refresh_month(date.year(), date.month())
                        .await?;
                }
                SourceTable::Bookings | SourceTable::VolunteerBookings => {}
            }
        }
        Ok(())
    }
}
