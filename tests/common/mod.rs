//! Shared utilities for integration tests.
//!
//! Provides an in-memory SQLite database with the full schema and helpers for
//! seeding source rows.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::SqlitePool;

use foodbank_rollup::config::StorageConfig;
use foodbank_rollup::retention::{AllowList, PurgeOrchestrator};
use foodbank_rollup::rollup::RollupEngine;
use foodbank_rollup::storage::schema::SourceTable;
use foodbank_rollup::storage::{connect, init_schema, Stores};

/// Everything a test needs, over one in-memory database.
pub struct TestDb {
    pub pool: SqlitePool,
    pub stores: Stores,
    pub rollups: RollupEngine,
}

impl TestDb {
    pub async fn new() -> Self {
        let pool = connect(&StorageConfig::in_memory())
            .await
            .expect("Failed to open in-memory SQLite");
        init_schema(&pool).await.expect("Failed to create schema");

        let stores = Stores::sqlite(pool.clone());
        let rollups = RollupEngine::new(Arc::clone(&stores.rollup));
        Self {
            pool,
            stores,
            rollups,
        }
    }

    pub fn orchestrator(&self) -> PurgeOrchestrator {
        self.orchestrator_with(AllowList::standard())
    }

    pub fn orchestrator_with(&self, allow_list: AllowList) -> PurgeOrchestrator {
        PurgeOrchestrator::new(
            allow_list,
            Arc::clone(&self.stores.retention),
            self.rollups.clone(),
        )
    }

    pub async fn insert_visit(&self, date: NaiveDate, adults: i64, children: i64, weight: i64) {
        sqlx::query(
            "INSERT INTO client_visits (client_id, date, adults, children, weight) VALUES (1, ?1, ?2, ?3, ?4)",
        )
        .bind(date)
        .bind(adults)
        .bind(children)
        .bind(weight)
        .execute(&self.pool)
        .await
        .expect("insert visit");
    }

    pub async fn insert_booking(&self, date: NaiveDate) {
        sqlx::query("INSERT INTO bookings (client_id, date) VALUES (1, ?1)")
            .bind(date)
            .execute(&self.pool)
            .await
            .expect("insert booking");
    }

    pub async fn insert_donor(&self, name: &str, is_pet_food: bool) -> i64 {
        sqlx::query("INSERT INTO donors (name, is_pet_food) VALUES (?1, ?2)")
            .bind(name)
            .bind(is_pet_food)
            .execute(&self.pool)
            .await
            .expect("insert donor")
            .last_insert_rowid()
    }

    pub async fn set_pet_food(&self, donor_id: i64, is_pet_food: bool) {
        sqlx::query("UPDATE donors SET is_pet_food = ?1 WHERE id = ?2")
            .bind(is_pet_food)
            .bind(donor_id)
            .execute(&self.pool)
            .await
            .expect("update donor");
    }

    pub async fn insert_donation(&self, date: NaiveDate, donor_id: i64, weight: i64) -> i64 {
        sqlx::query("INSERT INTO donations (date, donor_id, weight) VALUES (?1, ?2, ?3)")
            .bind(date)
            .bind(donor_id)
            .bind(weight)
            .execute(&self.pool)
            .await
            .expect("insert donation")
            .last_insert_rowid()
    }

    /// Insert into surplus, pig-pound or outgoing donation logs.
    pub async fn insert_weight(&self, table: SourceTable, date: NaiveDate, weight: i64) {
        let sql = format!("INSERT INTO {} (date, weight) VALUES (?1, ?2)", table.name());
        sqlx::query(&sql)
            .bind(date)
            .bind(weight)
            .execute(&self.pool)
            .await
            .expect("insert weight log");
    }

    pub async fn insert_sunshine(&self, date: NaiveDate, client_count: i64, weight: i64) {
        sqlx::query("INSERT INTO sunshine_bag_log (date, client_count, weight) VALUES (?1, ?2, ?3)")
            .bind(date)
            .bind(client_count)
            .bind(weight)
            .execute(&self.pool)
            .await
            .expect("insert sunshine bag");
    }

    pub async fn insert_shift(
        &self,
        volunteer_id: i64,
        shift_date: NaiveDate,
        start_time: &str,
        hours: f64,
        status: &str,
    ) {
        sqlx::query(
            "INSERT INTO volunteer_bookings (volunteer_id, shift_date, start_time, hours, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(volunteer_id)
        .bind(shift_date)
        .bind(start_time)
        .bind(hours)
        .bind(status)
        .execute(&self.pool)
        .await
        .expect("insert volunteer booking");
    }

    /// Move a row to another date, as an edit would.
    pub async fn move_row(&self, table: SourceTable, id: i64, date: NaiveDate) {
        let sql = format!("UPDATE {} SET date = ?1 WHERE id = ?2", table.name());
        sqlx::query(&sql)
            .bind(date)
            .bind(id)
            .execute(&self.pool)
            .await
            .expect("move row");
    }

    pub async fn count(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }

    /// Rows in `table` dated before `cutoff`.
    pub async fn count_before(&self, table: SourceTable, cutoff: NaiveDate) -> i64 {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE {} < ?1",
            table.name(),
            match table {
                SourceTable::VolunteerBookings => "shift_date",
                _ => "date",
            }
        );
        sqlx::query_scalar(&sql)
            .bind(cutoff)
            .fetch_one(&self.pool)
            .await
            .expect("count rows before cutoff")
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
