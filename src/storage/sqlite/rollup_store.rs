//! SQLite implementation of RollupStore.

use async_trait::async_trait;
use sea_query::{Alias, Expr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{coalesce_sum, month_from_row};
use crate::calendar::DateWindow;
use crate::interfaces::rollup_store::{Result, RollupStore, StorageError};
use crate::model::{
    DonorMonthly, DonorTotals, PantryMonthly, PantryTotals, PantryYearly, SunshineMonthly,
    SunshineTotals, VisitTotals, WarehouseMonthly, WeeklyAggregate,
};
use crate::storage::schema::{
    ClientVisits, DonorMonthlyAggregations, PantryMonthlyOverall, PantryWeeklyOverall,
    PantryWeeklyRetained, PantryYearlyOverall, SourceTable, SunshineBagLog,
    SunshineBagMonthlyOverall, SunshineBagMonthlyRetained, WarehouseMonthlyOverall,
    WarehouseMonthlyRetained, WeightLog,
};

/// Per-donor sums split on the donor's pet-food flag at query time.
const DONOR_TOTALS_SQL: &str = "
    SELECT d.donor_id AS donor_id,
           COALESCE(SUM(CASE WHEN o.is_pet_food = 0 THEN d.weight ELSE 0 END), 0) AS donations,
           COALESCE(SUM(CASE WHEN o.is_pet_food <> 0 THEN d.weight ELSE 0 END), 0) AS pet_food
    FROM donations d
    JOIN donors o ON o.id = d.donor_id
    WHERE d.date >= ?1 AND d.date < ?2
    GROUP BY d.donor_id
    ORDER BY d.donor_id";

/// Retained per-donor weights, split the same way.
const RETAINED_DONOR_TOTALS_SQL: &str = "
    SELECT r.donor_id AS donor_id,
           COALESCE(SUM(CASE WHEN o.is_pet_food = 0 THEN r.weight ELSE 0 END), 0) AS donations,
           COALESCE(SUM(CASE WHEN o.is_pet_food <> 0 THEN r.weight ELSE 0 END), 0) AS pet_food
    FROM donor_monthly_retained r
    JOIN donors o ON o.id = r.donor_id
    WHERE r.year = ?1 AND r.month = ?2
    GROUP BY r.donor_id
    ORDER BY r.donor_id";

/// SQLite-backed rollup store.
pub struct SqliteRollupStore {
    pool: SqlitePool,
}

impl SqliteRollupStore {
    /// Create a new SQLite rollup store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_totals(&self, query: &str) -> Result<PantryTotals> {
        let row = sqlx::query(query).fetch_one(&self.pool).await?;
        totals_from_row(&row)
    }
}

/// Select the five pantry sums over the weekly table.
fn weekly_sums() -> SelectStatement {
    Query::select()
        .expr_as(coalesce_sum(PantryWeeklyOverall::Orders), PantryWeeklyOverall::Orders)
        .expr_as(coalesce_sum(PantryWeeklyOverall::Adults), PantryWeeklyOverall::Adults)
        .expr_as(coalesce_sum(PantryWeeklyOverall::Children), PantryWeeklyOverall::Children)
        .expr_as(coalesce_sum(PantryWeeklyOverall::People), PantryWeeklyOverall::People)
        .expr_as(coalesce_sum(PantryWeeklyOverall::Weight), PantryWeeklyOverall::Weight)
        .from(PantryWeeklyOverall::Table)
        .to_owned()
}

fn totals_from_row(row: &SqliteRow) -> Result<PantryTotals> {
    Ok(PantryTotals {
        orders: row.try_get("orders")?,
        adults: row.try_get("adults")?,
        children: row.try_get("children")?,
        people: row.try_get("people")?,
        weight: row.try_get("weight")?,
    })
}

fn donor_totals_from_row(row: &SqliteRow) -> Result<DonorTotals> {
    Ok(DonorTotals {
        donor_id: row.try_get("donor_id")?,
        donations: row.try_get("donations")?,
        pet_food: row.try_get("pet_food")?,
    })
}

fn weekly_from_row(row: &SqliteRow) -> Result<WeeklyAggregate> {
    let (year, month) = month_from_row(row)?;
    let week: i64 = row.try_get("week")?;
    Ok(WeeklyAggregate {
        year,
        month,
        week: u32::try_from(week).map_err(|_| StorageError::OutOfRange(format!("week {week}")))?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        totals: totals_from_row(row)?,
    })
}

#[async_trait]
impl RollupStore for SqliteRollupStore {
    async fn visit_totals(&self, window: DateWindow) -> Result<VisitTotals> {
        let query = Query::select()
            .expr_as(Expr::col(ClientVisits::Id).count(), Alias::new("visits"))
            .expr_as(coalesce_sum(ClientVisits::Adults), ClientVisits::Adults)
            .expr_as(coalesce_sum(ClientVisits::Children), ClientVisits::Children)
            .expr_as(coalesce_sum(ClientVisits::Weight), ClientVisits::Weight)
            .from(ClientVisits::Table)
            .and_where(Expr::col(ClientVisits::Date).gte(window.start))
            .and_where(Expr::col(ClientVisits::Date).lt(window.end))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;

        Ok(VisitTotals {
            visits: row.try_get("visits")?,
            adults: row.try_get("adults")?,
            children: row.try_get("children")?,
            weight: row.try_get("weight")?,
        })
    }

    async fn sunshine_totals(&self, window: DateWindow) -> Result<SunshineTotals> {
        let query = Query::select()
            .expr_as(
                coalesce_sum(SunshineBagLog::ClientCount),
                SunshineBagLog::ClientCount,
            )
            .expr_as(coalesce_sum(SunshineBagLog::Weight), SunshineBagLog::Weight)
            .from(SunshineBagLog::Table)
            .and_where(Expr::col(SunshineBagLog::Date).gte(window.start))
            .and_where(Expr::col(SunshineBagLog::Date).lt(window.end))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;

        Ok(SunshineTotals {
            orders: row.try_get("client_count")?,
            weight: row.try_get("weight")?,
        })
    }

    async fn donor_totals(&self, window: DateWindow) -> Result<Vec<DonorTotals>> {
        let rows = sqlx::query(DONOR_TOTALS_SQL)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(donor_totals_from_row).collect()
    }

    async fn weight_total(&self, table: SourceTable, window: DateWindow) -> Result<i64> {
        if matches!(table, SourceTable::Bookings | SourceTable::VolunteerBookings) {
            return Err(StorageError::NotAWeightLog(table.name()));
        }

        let query = Query::select()
            .expr_as(coalesce_sum(WeightLog::Weight), WeightLog::Weight)
            .from(table)
            .and_where(Expr::col(WeightLog::Date).gte(window.start))
            .and_where(Expr::col(WeightLog::Date).lt(window.end))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_one(&self.pool).await?;
        Ok(row.try_get("weight")?)
    }

    async fn retained_week(&self, year: i32, month: u32, week: u32) -> Result<PantryTotals> {
        let query = Query::select()
            .columns([
                PantryWeeklyRetained::Orders,
                PantryWeeklyRetained::Adults,
                PantryWeeklyRetained::Children,
                PantryWeeklyRetained::People,
                PantryWeeklyRetained::Weight,
            ])
            .from(PantryWeeklyRetained::Table)
            .and_where(Expr::col(PantryWeeklyRetained::Year).eq(year))
            .and_where(Expr::col(PantryWeeklyRetained::Month).eq(month))
            .and_where(Expr::col(PantryWeeklyRetained::Week).eq(week))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => totals_from_row(&row),
            None => Ok(PantryTotals::default()),
        }
    }

    async fn retained_sunshine(&self, year: i32, month: u32) -> Result<SunshineTotals> {
        let query = Query::select()
            .columns([
                SunshineBagMonthlyRetained::Orders,
                SunshineBagMonthlyRetained::Weight,
            ])
            .from(SunshineBagMonthlyRetained::Table)
            .and_where(Expr::col(SunshineBagMonthlyRetained::Year).eq(year))
            .and_where(Expr::col(SunshineBagMonthlyRetained::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(SunshineTotals {
                orders: row.try_get("orders")?,
                weight: row.try_get("weight")?,
            }),
            None => Ok(SunshineTotals::default()),
        }
    }

    async fn retained_weight(&self, table: SourceTable, year: i32, month: u32) -> Result<i64> {
        let column = match table {
            SourceTable::SurplusLog => WarehouseMonthlyRetained::Surplus,
            SourceTable::PigPoundLog => WarehouseMonthlyRetained::PigPound,
            SourceTable::OutgoingDonationLog => WarehouseMonthlyRetained::OutgoingDonations,
            _ => return Err(StorageError::NotAWarehouseLog(table.name())),
        };

        let query = Query::select()
            .expr_as(Expr::col(column), Alias::new("weight"))
            .from(WarehouseMonthlyRetained::Table)
            .and_where(Expr::col(WarehouseMonthlyRetained::Year).eq(year))
            .and_where(Expr::col(WarehouseMonthlyRetained::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(row.try_get("weight")?),
            None => Ok(0),
        }
    }

    async fn retained_donor_totals(&self, year: i32, month: u32) -> Result<Vec<DonorTotals>> {
        let rows = sqlx::query(RETAINED_DONOR_TOTALS_SQL)
            .bind(year)
            .bind(i64::from(month))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(donor_totals_from_row).collect()
    }

    async fn upsert_weekly(&self, weekly: &WeeklyAggregate) -> Result<()> {
        let totals = weekly.totals;

        let query = Query::insert()
            .into_table(PantryWeeklyOverall::Table)
            .columns([
                PantryWeeklyOverall::Year,
                PantryWeeklyOverall::Month,
                PantryWeeklyOverall::Week,
                PantryWeeklyOverall::StartDate,
                PantryWeeklyOverall::EndDate,
                PantryWeeklyOverall::Orders,
                PantryWeeklyOverall::Adults,
                PantryWeeklyOverall::Children,
                PantryWeeklyOverall::People,
                PantryWeeklyOverall::Weight,
            ])
            .values_panic([
                weekly.year.into(),
                weekly.month.into(),
                weekly.week.into(),
                weekly.start_date.into(),
                weekly.end_date.into(),
                totals.orders.into(),
                totals.adults.into(),
                totals.children.into(),
                totals.people.into(),
                totals.weight.into(),
            ])
            .on_conflict(
                OnConflict::columns([
                    PantryWeeklyOverall::Year,
                    PantryWeeklyOverall::Month,
                    PantryWeeklyOverall::Week,
                ])
                .update_columns([
                    PantryWeeklyOverall::StartDate,
                    PantryWeeklyOverall::EndDate,
                    PantryWeeklyOverall::Orders,
                    PantryWeeklyOverall::Adults,
                    PantryWeeklyOverall::Children,
                    PantryWeeklyOverall::People,
                    PantryWeeklyOverall::Weight,
                ])
                .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn weekly_sum_for_month(&self, year: i32, month: u32) -> Result<PantryTotals> {
        let query = weekly_sums()
            .and_where(Expr::col(PantryWeeklyOverall::Year).eq(year))
            .and_where(Expr::col(PantryWeeklyOverall::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        self.fetch_totals(&query).await
    }

    async fn weekly_sum_for_year(&self, year: i32) -> Result<PantryTotals> {
        let query = weekly_sums()
            .and_where(Expr::col(PantryWeeklyOverall::Year).eq(year))
            .to_string(SqliteQueryBuilder);

        self.fetch_totals(&query).await
    }

    async fn upsert_pantry_monthly(&self, monthly: &PantryMonthly) -> Result<()> {
        let totals = monthly.totals;

        let query = Query::insert()
            .into_table(PantryMonthlyOverall::Table)
            .columns([
                PantryMonthlyOverall::Year,
                PantryMonthlyOverall::Month,
                PantryMonthlyOverall::Orders,
                PantryMonthlyOverall::Adults,
                PantryMonthlyOverall::Children,
                PantryMonthlyOverall::People,
                PantryMonthlyOverall::Weight,
            ])
            .values_panic([
                monthly.year.into(),
                monthly.month.into(),
                totals.orders.into(),
                totals.adults.into(),
                totals.children.into(),
                totals.people.into(),
                totals.weight.into(),
            ])
            .on_conflict(
                OnConflict::columns([PantryMonthlyOverall::Year, PantryMonthlyOverall::Month])
                    .update_columns([
                        PantryMonthlyOverall::Orders,
                        PantryMonthlyOverall::Adults,
                        PantryMonthlyOverall::Children,
                        PantryMonthlyOverall::People,
                        PantryMonthlyOverall::Weight,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_pantry_yearly(&self, yearly: &PantryYearly) -> Result<()> {
        let totals = yearly.totals;

        let query = Query::insert()
            .into_table(PantryYearlyOverall::Table)
            .columns([
                PantryYearlyOverall::Year,
                PantryYearlyOverall::Orders,
                PantryYearlyOverall::Adults,
                PantryYearlyOverall::Children,
                PantryYearlyOverall::People,
                PantryYearlyOverall::Weight,
            ])
            .values_panic([
                yearly.year.into(),
                totals.orders.into(),
                totals.adults.into(),
                totals.children.into(),
                totals.people.into(),
                totals.weight.into(),
            ])
            .on_conflict(
                OnConflict::column(PantryYearlyOverall::Year)
                    .update_columns([
                        PantryYearlyOverall::Orders,
                        PantryYearlyOverall::Adults,
                        PantryYearlyOverall::Children,
                        PantryYearlyOverall::People,
                        PantryYearlyOverall::Weight,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn replace_warehouse_month(
        &self,
        monthly: &WarehouseMonthly,
        donors: &[DonorMonthly],
    ) -> Result<()> {
        let upsert = Query::insert()
            .into_table(WarehouseMonthlyOverall::Table)
            .columns([
                WarehouseMonthlyOverall::Year,
                WarehouseMonthlyOverall::Month,
                WarehouseMonthlyOverall::Donations,
                WarehouseMonthlyOverall::PetFood,
                WarehouseMonthlyOverall::Surplus,
                WarehouseMonthlyOverall::PigPound,
                WarehouseMonthlyOverall::OutgoingDonations,
            ])
            .values_panic([
                monthly.year.into(),
                monthly.month.into(),
                monthly.donations.into(),
                monthly.pet_food.into(),
                monthly.surplus.into(),
                monthly.pig_pound.into(),
                monthly.outgoing_donations.into(),
            ])
            .on_conflict(
                OnConflict::columns([
                    WarehouseMonthlyOverall::Year,
                    WarehouseMonthlyOverall::Month,
                ])
                .update_columns([
                    WarehouseMonthlyOverall::Donations,
                    WarehouseMonthlyOverall::PetFood,
                    WarehouseMonthlyOverall::Surplus,
                    WarehouseMonthlyOverall::PigPound,
                    WarehouseMonthlyOverall::OutgoingDonations,
                ])
                .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        let delete = Query::delete()
            .from_table(DonorMonthlyAggregations::Table)
            .and_where(Expr::col(DonorMonthlyAggregations::Year).eq(monthly.year))
            .and_where(Expr::col(DonorMonthlyAggregations::Month).eq(monthly.month))
            .to_string(SqliteQueryBuilder);

        // Rendered up front; statement builders must not live across awaits
        let insert = if donors.is_empty() {
            None
        } else {
            let mut insert = Query::insert();
            insert.into_table(DonorMonthlyAggregations::Table).columns([
                DonorMonthlyAggregations::Year,
                DonorMonthlyAggregations::Month,
                DonorMonthlyAggregations::DonorId,
                DonorMonthlyAggregations::Donations,
                DonorMonthlyAggregations::PetFood,
            ]);
            for donor in donors {
                insert.values_panic([
                    donor.year.into(),
                    donor.month.into(),
                    donor.donor_id.into(),
                    donor.donations.into(),
                    donor.pet_food.into(),
                ]);
            }
            Some(insert.to_string(SqliteQueryBuilder))
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(&upsert).execute(&mut *tx).await?;
        sqlx::query(&delete).execute(&mut *tx).await?;
        if let Some(insert) = insert {
            sqlx::query(&insert).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn upsert_sunshine_monthly(&self, monthly: &SunshineMonthly) -> Result<()> {
        let query = Query::insert()
            .into_table(SunshineBagMonthlyOverall::Table)
            .columns([
                SunshineBagMonthlyOverall::Year,
                SunshineBagMonthlyOverall::Month,
                SunshineBagMonthlyOverall::Orders,
                SunshineBagMonthlyOverall::Weight,
            ])
            .values_panic([
                monthly.year.into(),
                monthly.month.into(),
                monthly.totals.orders.into(),
                monthly.totals.weight.into(),
            ])
            .on_conflict(
                OnConflict::columns([
                    SunshineBagMonthlyOverall::Year,
                    SunshineBagMonthlyOverall::Month,
                ])
                .update_columns([
                    SunshineBagMonthlyOverall::Orders,
                    SunshineBagMonthlyOverall::Weight,
                ])
                .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn weekly_for_month(&self, year: i32, month: u32) -> Result<Vec<WeeklyAggregate>> {
        let query = Query::select()
            .columns([
                PantryWeeklyOverall::Year,
                PantryWeeklyOverall::Month,
                PantryWeeklyOverall::Week,
                PantryWeeklyOverall::StartDate,
                PantryWeeklyOverall::EndDate,
                PantryWeeklyOverall::Orders,
                PantryWeeklyOverall::Adults,
                PantryWeeklyOverall::Children,
                PantryWeeklyOverall::People,
                PantryWeeklyOverall::Weight,
            ])
            .from(PantryWeeklyOverall::Table)
            .and_where(Expr::col(PantryWeeklyOverall::Year).eq(year))
            .and_where(Expr::col(PantryWeeklyOverall::Month).eq(month))
            .order_by(PantryWeeklyOverall::Week, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(weekly_from_row).collect()
    }

    async fn pantry_monthly(&self, year: i32, month: u32) -> Result<Option<PantryMonthly>> {
        let query = Query::select()
            .columns([
                PantryMonthlyOverall::Year,
                PantryMonthlyOverall::Month,
                PantryMonthlyOverall::Orders,
                PantryMonthlyOverall::Adults,
                PantryMonthlyOverall::Children,
                PantryMonthlyOverall::People,
                PantryMonthlyOverall::Weight,
            ])
            .from(PantryMonthlyOverall::Table)
            .and_where(Expr::col(PantryMonthlyOverall::Year).eq(year))
            .and_where(Expr::col(PantryMonthlyOverall::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(PantryMonthly {
                year,
                month,
                totals: totals_from_row(&row)?,
            })),
            None => Ok(None),
        }
    }

    async fn pantry_yearly(&self, year: i32) -> Result<Option<PantryYearly>> {
        let query = Query::select()
            .columns([
                PantryYearlyOverall::Orders,
                PantryYearlyOverall::Adults,
                PantryYearlyOverall::Children,
                PantryYearlyOverall::People,
                PantryYearlyOverall::Weight,
            ])
            .from(PantryYearlyOverall::Table)
            .and_where(Expr::col(PantryYearlyOverall::Year).eq(year))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(PantryYearly {
                year,
                totals: totals_from_row(&row)?,
            })),
            None => Ok(None),
        }
    }

    async fn warehouse_monthly(&self, year: i32, month: u32) -> Result<Option<WarehouseMonthly>> {
        let query = Query::select()
            .columns([
                WarehouseMonthlyOverall::Donations,
                WarehouseMonthlyOverall::PetFood,
                WarehouseMonthlyOverall::Surplus,
                WarehouseMonthlyOverall::PigPound,
                WarehouseMonthlyOverall::OutgoingDonations,
            ])
            .from(WarehouseMonthlyOverall::Table)
            .and_where(Expr::col(WarehouseMonthlyOverall::Year).eq(year))
            .and_where(Expr::col(WarehouseMonthlyOverall::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(WarehouseMonthly {
                year,
                month,
                donations: row.try_get("donations")?,
                pet_food: row.try_get("pet_food")?,
                surplus: row.try_get("surplus")?,
                pig_pound: row.try_get("pig_pound")?,
                outgoing_donations: row.try_get("outgoing_donations")?,
            })),
            None => Ok(None),
        }
    }

    async fn donor_monthly(&self, year: i32, month: u32) -> Result<Vec<DonorMonthly>> {
        let query = Query::select()
            .columns([
                DonorMonthlyAggregations::DonorId,
                DonorMonthlyAggregations::Donations,
                DonorMonthlyAggregations::PetFood,
            ])
            .from(DonorMonthlyAggregations::Table)
            .and_where(Expr::col(DonorMonthlyAggregations::Year).eq(year))
            .and_where(Expr::col(DonorMonthlyAggregations::Month).eq(month))
            .order_by(DonorMonthlyAggregations::DonorId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(DonorMonthly {
                    year,
                    month,
                    donor_id: row.try_get("donor_id")?,
                    donations: row.try_get("donations")?,
                    pet_food: row.try_get("pet_food")?,
                })
            })
            .collect()
    }

    async fn sunshine_monthly(&self, year: i32, month: u32) -> Result<Option<SunshineMonthly>> {
        let query = Query::select()
            .columns([
                SunshineBagMonthlyOverall::Orders,
                SunshineBagMonthlyOverall::Weight,
            ])
            .from(SunshineBagMonthlyOverall::Table)
            .and_where(Expr::col(SunshineBagMonthlyOverall::Year).eq(year))
            .and_where(Expr::col(SunshineBagMonthlyOverall::Month).eq(month))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;

        match row {
            Some(row) => Ok(Some(SunshineMonthly {
                year,
                month,
                totals: SunshineTotals {
                    orders: row.try_get("orders")?,
                    weight: row.try_get("weight")?,
                },
            })),
            None => Ok(None),
        }
    }
}
