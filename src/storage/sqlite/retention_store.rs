//! SQLite implementation of RetentionStore.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_query::{Alias, Expr, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use super::coalesce_sum;
use crate::calendar::{truncate_to_month, week_containing, PantryWeek};
use crate::interfaces::retention_store::{PurgePlan, PurgeTarget, RetentionStore};
use crate::interfaces::rollup_store::Result;
use crate::model::{PantryTotals, VolunteerArchive};
use crate::storage::schema::{
    ClientVisits, SourceTable, SunshineBagLog, VolunteerArchive as VolunteerArchiveTable,
};

/// Fold bookings dated before ?1 into the per-volunteer archive.
///
/// Counters accumulate across purges; the early-bird flag is sticky.
const FOLD_VOLUNTEER_ARCHIVE_SQL: &str = "
    INSERT INTO volunteer_archive (volunteer_id, hours, shifts, bookings, no_shows, early_bird)
    SELECT volunteer_id,
           COALESCE(SUM(CASE WHEN status = 'completed' THEN hours ELSE 0 END), 0),
           SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END),
           COUNT(*),
           SUM(CASE WHEN status = 'no_show' THEN 1 ELSE 0 END),
           MAX(CASE WHEN status = 'completed' AND start_time < '09:00' THEN 1 ELSE 0 END)
    FROM volunteer_bookings
    WHERE shift_date < ?1
    GROUP BY volunteer_id
    ON CONFLICT (volunteer_id) DO UPDATE SET
        hours = volunteer_archive.hours + excluded.hours,
        shifts = volunteer_archive.shifts + excluded.shifts,
        bookings = volunteer_archive.bookings + excluded.bookings,
        no_shows = volunteer_archive.no_shows + excluded.no_shows,
        early_bird = MAX(volunteer_archive.early_bird, excluded.early_bird)";

/// Add one week's purged share to the retained pantry weeks.
const RETAIN_PANTRY_WEEK_SQL: &str = "
    INSERT INTO pantry_weekly_retained (year, month, week, orders, adults, children, people, weight)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT (year, month, week) DO UPDATE SET
        orders = pantry_weekly_retained.orders + excluded.orders,
        adults = pantry_weekly_retained.adults + excluded.adults,
        children = pantry_weekly_retained.children + excluded.children,
        people = pantry_weekly_retained.people + excluded.people,
        weight = pantry_weekly_retained.weight + excluded.weight";

const RETAIN_SUNSHINE_MONTHS_SQL: &str = "
    INSERT INTO sunshine_bag_monthly_retained (year, month, orders, weight)
    SELECT CAST(strftime('%Y', date) AS INTEGER),
           CAST(strftime('%m', date) AS INTEGER),
           SUM(client_count),
           SUM(weight)
    FROM sunshine_bag_log
    WHERE date < ?1
    GROUP BY strftime('%Y', date), strftime('%m', date)
    ON CONFLICT (year, month) DO UPDATE SET
        orders = sunshine_bag_monthly_retained.orders + excluded.orders,
        weight = sunshine_bag_monthly_retained.weight + excluded.weight";

/// Donations are retained as raw weight; the pet-food split happens on refresh.
const RETAIN_DONATIONS_SQL: &str = "
    INSERT INTO donor_monthly_retained (year, month, donor_id, weight)
    SELECT CAST(strftime('%Y', date) AS INTEGER),
           CAST(strftime('%m', date) AS INTEGER),
           donor_id,
           SUM(weight)
    FROM donations
    WHERE date < ?1
    GROUP BY strftime('%Y', date), strftime('%m', date), donor_id
    ON CONFLICT (year, month, donor_id) DO UPDATE SET
        weight = donor_monthly_retained.weight + excluded.weight";

const RETAIN_SURPLUS_SQL: &str = "
    INSERT INTO warehouse_monthly_retained (year, month, surplus)
    SELECT CAST(strftime('%Y', date) AS INTEGER),
           CAST(strftime('%m', date) AS INTEGER),
           SUM(weight)
    FROM surplus_log
    WHERE date < ?1
    GROUP BY strftime('%Y', date), strftime('%m', date)
    ON CONFLICT (year, month) DO UPDATE SET
        surplus = warehouse_monthly_retained.surplus + excluded.surplus";

const RETAIN_PIG_POUND_SQL: &str = "
    INSERT INTO warehouse_monthly_retained (year, month, pig_pound)
    SELECT CAST(strftime('%Y', date) AS INTEGER),
           CAST(strftime('%m', date) AS INTEGER),
           SUM(weight)
    FROM pig_pound_log
    WHERE date < ?1
    GROUP BY strftime('%Y', date), strftime('%m', date)
    ON CONFLICT (year, month) DO UPDATE SET
        pig_pound = warehouse_monthly_retained.pig_pound + excluded.pig_pound";

const RETAIN_OUTGOING_SQL: &str = "
    INSERT INTO warehouse_monthly_retained (year, month, outgoing_donations)
    SELECT CAST(strftime('%Y', date) AS INTEGER),
           CAST(strftime('%m', date) AS INTEGER),
           SUM(weight)
    FROM outgoing_donation_log
    WHERE date < ?1
    GROUP BY strftime('%Y', date), strftime('%m', date)
    ON CONFLICT (year, month) DO UPDATE SET
        outgoing_donations = warehouse_monthly_retained.outgoing_donations
            + excluded.outgoing_donations";

/// SQLite-backed retention store.
pub struct SqliteRetentionStore {
    pool: SqlitePool,
}

impl SqliteRetentionStore {
    /// Create a new SQLite retention store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Fold the contribution of `table`'s rows dated before `cutoff` into the
/// archive or retained tables, ahead of their deletion.
async fn fold_purged_rows(
    conn: &mut SqliteConnection,
    table: SourceTable,
    cutoff: NaiveDate,
) -> Result<()> {
    let monthly = match table {
        SourceTable::ClientVisits => None,
        SourceTable::SunshineBagLog => Some(RETAIN_SUNSHINE_MONTHS_SQL),
        SourceTable::Donations => Some(RETAIN_DONATIONS_SQL),
        SourceTable::SurplusLog => Some(RETAIN_SURPLUS_SQL),
        SourceTable::PigPoundLog => Some(RETAIN_PIG_POUND_SQL),
        SourceTable::OutgoingDonationLog => Some(RETAIN_OUTGOING_SQL),
        SourceTable::VolunteerBookings => Some(FOLD_VOLUNTEER_ARCHIVE_SQL),
        SourceTable::Bookings => return Ok(()),
    };

    if matches!(
        table,
        SourceTable::ClientVisits | SourceTable::SunshineBagLog
    ) {
        let weeks = retain_pantry_weeks(conn, table, cutoff).await?;
        debug!(table = table.name(), weeks, %cutoff, "retained pantry weeks");
    }

    if let Some(sql) = monthly {
        let folded = sqlx::query(sql).bind(cutoff).execute(&mut *conn).await?;
        debug!(
            table = table.name(),
            rows = folded.rows_affected(),
            %cutoff,
            "folded purged rows"
        );
    }

    Ok(())
}

/// Add the per-week share of `table`'s rows before `cutoff` to the retained
/// pantry weeks. Rows on weekends belong to no week and are skipped.
///
/// Returns the number of weeks touched.
async fn retain_pantry_weeks(
    conn: &mut SqliteConnection,
    table: SourceTable,
    cutoff: NaiveDate,
) -> Result<usize> {
    let query = match table {
        SourceTable::ClientVisits => Query::select()
            .column(ClientVisits::Date)
            .expr_as(Expr::col(ClientVisits::Id).count(), Alias::new("orders"))
            .expr_as(coalesce_sum(ClientVisits::Adults), ClientVisits::Adults)
            .expr_as(coalesce_sum(ClientVisits::Children), ClientVisits::Children)
            .expr_as(coalesce_sum(ClientVisits::Weight), ClientVisits::Weight)
            .from(ClientVisits::Table)
            .and_where(Expr::col(ClientVisits::Date).lt(cutoff))
            .group_by_col(ClientVisits::Date)
            .to_string(SqliteQueryBuilder),
        SourceTable::SunshineBagLog => Query::select()
            .column(SunshineBagLog::Date)
            .expr_as(coalesce_sum(SunshineBagLog::ClientCount), Alias::new("orders"))
            .expr_as(Expr::val(0), Alias::new("adults"))
            .expr_as(Expr::val(0), Alias::new("children"))
            .expr_as(coalesce_sum(SunshineBagLog::Weight), SunshineBagLog::Weight)
            .from(SunshineBagLog::Table)
            .and_where(Expr::col(SunshineBagLog::Date).lt(cutoff))
            .group_by_col(SunshineBagLog::Date)
            .to_string(SqliteQueryBuilder),
        _ => return Ok(0),
    };

    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;

    let mut weeks: BTreeMap<PantryWeek, PantryTotals> = BTreeMap::new();
    for row in rows {
        let date: NaiveDate = row.try_get("date")?;
        let Some(week) = week_containing(date) else {
            continue;
        };
        let adults: i64 = row.try_get("adults")?;
        let children: i64 = row.try_get("children")?;
        let day = PantryTotals {
            orders: row.try_get("orders")?,
            adults,
            children,
            people: adults + children,
            weight: row.try_get("weight")?,
        };
        let totals = weeks.entry(week).or_default();
        *totals = *totals + day;
    }

    for (week, totals) in &weeks {
        sqlx::query(RETAIN_PANTRY_WEEK_SQL)
            .bind(week.year)
            .bind(i64::from(week.month))
            .bind(i64::from(week.week))
            .bind(totals.orders)
            .bind(totals.adults)
            .bind(totals.children)
            .bind(totals.people)
            .bind(totals.weight)
            .execute(&mut *conn)
            .await?;
    }

    Ok(weeks.len())
}

#[async_trait]
impl RetentionStore for SqliteRetentionStore {
    async fn months_before(
        &self,
        target: PurgeTarget,
        cutoff: NaiveDate,
    ) -> Result<Vec<NaiveDate>> {
        let query = Query::select()
            .distinct()
            .column(target.date_column)
            .from(target.table)
            .and_where(Expr::col(target.date_column).lt(cutoff))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut months = BTreeSet::new();
        for row in rows {
            let date: NaiveDate = row.try_get(0)?;
            months.insert(truncate_to_month(date));
        }

        Ok(months.into_iter().collect())
    }

    async fn has_rows_before(&self, target: PurgeTarget, cutoff: NaiveDate) -> Result<bool> {
        let query = Query::select()
            .expr(Expr::val(1))
            .from(target.table)
            .and_where(Expr::col(target.date_column).lt(cutoff))
            .limit(1)
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    async fn purge(&self, plan: &PurgePlan) -> Result<Vec<u64>> {
        let deletes: Vec<String> = plan
            .targets
            .iter()
            .map(|target| {
                Query::delete()
                    .from_table(target.table)
                    .and_where(Expr::col(target.date_column).lt(plan.cutoff))
                    .to_string(SqliteQueryBuilder)
            })
            .collect();

        let mut tx = self.pool.begin().await?;

        for target in &plan.targets {
            fold_purged_rows(&mut tx, target.table, plan.cutoff).await?;
        }

        let mut deleted = Vec::with_capacity(deletes.len());
        for query in &deletes {
            let result = sqlx::query(query).execute(&mut *tx).await?;
            deleted.push(result.rows_affected());
        }

        // Dropping the transaction on any error above rolls everything back
        tx.commit().await?;

        Ok(deleted)
    }

    async fn reclaim_storage(&self, tables: &[SourceTable]) -> Result<()> {
        if tables.is_empty() {
            return Ok(());
        }

        // SQLite has no per-table vacuum; one pass compacts every table
        debug!(?tables, "vacuuming database");
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    async fn volunteer_archive(&self, volunteer_id: i64) -> Result<Option<VolunteerArchive>> {
        let query = Query::select()
            .columns([
                VolunteerArchiveTable::Hours,
                VolunteerArchiveTable::Shifts,
                VolunteerArchiveTable::Bookings,
                VolunteerArchiveTable::NoShows,
                VolunteerArchiveTable::EarlyBird,
            ])
            .from(VolunteerArchiveTable::Table)
            .and_where(Expr::col(VolunteerArchiveTable::VolunteerId).eq(volunteer_id))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(VolunteerArchive {
                volunteer_id,
                hours: row.try_get("hours")?,
                shifts: row.try_get("shifts")?,
                bookings: row.try_get("bookings")?,
                no_shows: row.try_get("no_shows")?,
                early_bird: row.try_get("early_bird")?,
            })),
            None => Ok(None),
        }
    }
}
