//! Rollup calculator integration tests against in-memory SQLite.

mod common;

use common::{date, TestDb};
use foodbank_rollup::interfaces::RollupStore;
use foodbank_rollup::model::{AggregationDomain, PantryTotals, WeeklyAggregate};
use foodbank_rollup::rollup::{RollupError, SourceChange};
use foodbank_rollup::storage::schema::SourceTable;
use std::collections::BTreeSet;

fn weekly(year: i32, month: u32, week: u32, orders: i64, weight: i64) -> WeeklyAggregate {
    let start = date(year, month, 1);
    WeeklyAggregate {
        year,
        month,
        week,
        start_date: start,
        end_date: start,
        totals: PantryTotals {
            orders,
            adults: orders,
            children: 0,
            people: orders,
            weight,
        },
    }
}

// ============================================================================
// Pantry weekly
// ============================================================================

#[tokio::test]
async fn test_weekly_combines_visits_and_sunshine_bags() {
    let db = TestDb::new().await;
    // 2024-01-01 is a Monday, so week 1 is Jan 1..=Jan 5
    db.insert_visit(date(2024, 1, 2), 2, 1, 10).await;
    db.insert_visit(date(2024, 1, 5), 1, 0, 5).await;
    db.insert_visit(date(2024, 1, 6), 4, 4, 100).await; // Saturday
    db.insert_visit(date(2024, 1, 8), 1, 1, 7).await; // week 2
    db.insert_sunshine(date(2024, 1, 3), 2, 4).await;

    db.rollups.pantry().refresh_week(2024, 1, 1).await.unwrap();

    let rows = db.stores.rollup.weekly_for_month(2024, 1).await.unwrap();
    assert_eq!(rows.len(), 1);
    let week = &rows[0];
    assert_eq!(week.week, 1);
    assert_eq!(week.start_date, date(2024, 1, 1));
    assert_eq!(week.end_date, date(2024, 1, 5));
    assert_eq!(
        week.totals,
        PantryTotals {
            orders: 4,
            adults: 3,
            children: 1,
            people: 4,
            weight: 19,
        }
    );
}

#[tokio::test]
async fn test_weekly_refresh_is_idempotent() {
    let db = TestDb::new().await;
    db.insert_visit(date(2024, 1, 9), 1, 2, 12).await;

    db.rollups.pantry().refresh_week(2024, 1, 2).await.unwrap();
    let first = db.stores.rollup.weekly_for_month(2024, 1).await.unwrap();
    db.rollups.pantry().refresh_week(2024, 1, 2).await.unwrap();
    let second = db.stores.rollup.weekly_for_month(2024, 1).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(db.count("pantry_weekly_overall").await, 1);
}

#[tokio::test]
async fn test_week_outside_month_is_a_no_op() {
    let db = TestDb::new().await;
    // February 2024's first Monday is Feb 5; week 5 would start on Mar 4
    db.insert_visit(date(2024, 3, 4), 1, 0, 1).await;

    db.rollups.pantry().refresh_week(2024, 2, 5).await.unwrap();
    db.rollups.pantry().refresh_week(2024, 1, 6).await.unwrap();

    assert_eq!(db.count("pantry_weekly_overall").await, 0);
}

#[tokio::test]
async fn test_week_zero_and_bad_month_are_rejected() {
    let db = TestDb::new().await;

    assert!(matches!(
        db.rollups.pantry().refresh_week(2024, 1, 0).await,
        Err(RollupError::InvalidWeek(0))
    ));
    assert!(matches!(
        db.rollups.pantry().refresh_week(2024, 13, 1).await,
        Err(RollupError::InvalidMonth { month: 13, .. })
    ));
    assert!(matches!(
        db.rollups.pantry().refresh_month(2024, 0).await,
        Err(RollupError::InvalidMonth { month: 0, .. })
    ));
    assert_eq!(db.count("pantry_weekly_overall").await, 0);
}

// ============================================================================
// Pantry monthly and yearly
// ============================================================================

#[tokio::test]
async fn test_monthly_sums_weekly_rows() {
    let db = TestDb::new().await;
    let store = &db.stores.rollup;
    store.upsert_weekly(&weekly(2024, 3, 1, 3, 30)).await.unwrap();
    store.upsert_weekly(&weekly(2024, 3, 2, 4, 40)).await.unwrap();

    db.rollups.pantry().refresh_month(2024, 3).await.unwrap();

    let monthly = store.pantry_monthly(2024, 3).await.unwrap().unwrap();
    assert_eq!(monthly.totals.orders, 7);
    assert_eq!(monthly.totals.weight, 70);
    assert_eq!(monthly.totals, store.weekly_sum_for_month(2024, 3).await.unwrap());
}

#[tokio::test]
async fn test_monthly_does_not_recompute_weeks_from_source() {
    let db = TestDb::new().await;
    let store = &db.stores.rollup;
    // Source rows exist but no weekly row was ever written for them
    db.insert_visit(date(2024, 3, 5), 2, 2, 20).await;
    store.upsert_weekly(&weekly(2024, 3, 3, 5, 50)).await.unwrap();

    db.rollups.pantry().refresh_month(2024, 3).await.unwrap();

    let monthly = store.pantry_monthly(2024, 3).await.unwrap().unwrap();
    assert_eq!(monthly.totals.orders, 5);
    assert_eq!(store.weekly_for_month(2024, 3).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_month_upserts_zero_row() {
    let db = TestDb::new().await;

    db.rollups.pantry().refresh_month(2023, 7).await.unwrap();

    let monthly = db.stores.rollup.pantry_monthly(2023, 7).await.unwrap().unwrap();
    assert_eq!(monthly.totals, PantryTotals::default());
}

#[tokio::test]
async fn test_yearly_sums_weekly_rows_of_the_year() {
    let db = TestDb::new().await;
    let store = &db.stores.rollup;
    store.upsert_weekly(&weekly(2024, 1, 1, 2, 20)).await.unwrap();
    store.upsert_weekly(&weekly(2024, 6, 3, 5, 50)).await.unwrap();
    store.upsert_weekly(&weekly(2023, 12, 4, 100, 1000)).await.unwrap();

    db.rollups.pantry().refresh_year(2024).await.unwrap();

    let yearly = store.pantry_yearly(2024).await.unwrap().unwrap();
    assert_eq!(yearly.totals.orders, 7);
    assert_eq!(yearly.totals.weight, 70);
    assert_eq!(yearly.totals, store.weekly_sum_for_year(2024).await.unwrap());
}

#[tokio::test]
async fn test_rebuild_month_recomputes_every_week() {
    let db = TestDb::new().await;
    // March 2024 weeks start on the 4th, 11th, 18th and 25th
    db.insert_visit(date(2024, 3, 4), 1, 0, 10).await;
    db.insert_visit(date(2024, 3, 13), 1, 1, 10).await;
    db.insert_visit(date(2024, 3, 29), 2, 0, 10).await;
    db.insert_visit(date(2024, 3, 1), 9, 9, 99).await; // before first Monday

    db.rollups.pantry().rebuild_month(2024, 3).await.unwrap();

    let weeks = db.stores.rollup.weekly_for_month(2024, 3).await.unwrap();
    let numbers: Vec<u32> = weeks.iter().map(|w| w.week).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4]);

    let monthly = db.stores.rollup.pantry_monthly(2024, 3).await.unwrap().unwrap();
    assert_eq!(monthly.totals.orders, 3);
    assert_eq!(monthly.totals.people, 5);
    assert_eq!(monthly.totals.weight, 30);
}

#[tokio::test]
async fn test_refresh_months_updates_months_then_years() {
    let db = TestDb::new().await;
    let store = &db.stores.rollup;
    store.upsert_weekly(&weekly(2023, 11, 1, 1, 1)).await.unwrap();
    store.upsert_weekly(&weekly(2024, 2, 1, 2, 2)).await.unwrap();

    let months = BTreeSet::from([date(2023, 11, 1), date(2024, 2, 1)]);
    db.rollups
        .refresh_months(AggregationDomain::Pantry, &months)
        .await
        .unwrap();

    assert_eq!(store.pantry_monthly(2023, 11).await.unwrap().unwrap().totals.orders, 1);
    assert_eq!(store.pantry_monthly(2024, 2).await.unwrap().unwrap().totals.orders, 2);
    assert_eq!(store.pantry_yearly(2023).await.unwrap().unwrap().totals.orders, 1);
    assert_eq!(store.pantry_yearly(2024).await.unwrap().unwrap().totals.orders, 2);
}

// ============================================================================
// Warehouse and sunshine monthly
// ============================================================================

#[tokio::test]
async fn test_warehouse_month_splits_pet_food_by_donor() {
    let db = TestDb::new().await;
    let grocer = db.insert_donor("Grocer", false).await;
    let kibble = db.insert_donor("Kibble Co", true).await;
    db.insert_donation(date(2024, 3, 2), grocer, 100).await;
    db.insert_donation(date(2024, 3, 20), grocer, 20).await;
    db.insert_donation(date(2024, 3, 9), kibble, 30).await;
    db.insert_donation(date(2024, 4, 1), grocer, 500).await;
    db.insert_weight(SourceTable::SurplusLog, date(2024, 3, 3), 5).await;
    db.insert_weight(SourceTable::PigPoundLog, date(2024, 3, 4), 7).await;
    db.insert_weight(SourceTable::OutgoingDonationLog, date(2024, 3, 31), 9).await;

    db.rollups.warehouse().refresh_month(2024, 3).await.unwrap();

    let monthly = db.stores.rollup.warehouse_monthly(2024, 3).await.unwrap().unwrap();
    assert_eq!(monthly.donations, 120);
    assert_eq!(monthly.pet_food, 30);
    assert_eq!(monthly.surplus, 5);
    assert_eq!(monthly.pig_pound, 7);
    assert_eq!(monthly.outgoing_donations, 9);

    let donors = db.stores.rollup.donor_monthly(2024, 3).await.unwrap();
    assert_eq!(donors.len(), 2);
    assert_eq!(donors.iter().map(|d| d.donations).sum::<i64>(), monthly.donations);
    assert_eq!(donors.iter().map(|d| d.pet_food).sum::<i64>(), monthly.pet_food);
}

#[tokio::test]
async fn test_pet_food_flag_change_moves_weight_on_refresh() {
    let db = TestDb::new().await;
    let donor = db.insert_donor("Shelter Supply", true).await;
    db.insert_donation(date(2024, 5, 6), donor, 40).await;

    db.rollups.warehouse().refresh_month(2024, 5).await.unwrap();
    let before = db.stores.rollup.warehouse_monthly(2024, 5).await.unwrap().unwrap();
    assert_eq!((before.donations, before.pet_food), (0, 40));

    db.set_pet_food(donor, false).await;
    db.rollups.warehouse().refresh_month(2024, 5).await.unwrap();

    let after = db.stores.rollup.warehouse_monthly(2024, 5).await.unwrap().unwrap();
    assert_eq!((after.donations, after.pet_food), (40, 0));
    let donors = db.stores.rollup.donor_monthly(2024, 5).await.unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!((donors[0].donations, donors[0].pet_food), (40, 0));
}

#[tokio::test]
async fn test_flagging_donor_as_pet_food_moves_weight_on_refresh() {
    let db = TestDb::new().await;
    let donor = db.insert_donor("Corner Store", false).await;
    db.insert_donation(date(2024, 5, 14), donor, 25).await;

    db.rollups.warehouse().refresh_month(2024, 5).await.unwrap();
    let before = db.stores.rollup.warehouse_monthly(2024, 5).await.unwrap().unwrap();
    assert_eq!((before.donations, before.pet_food), (25, 0));

    db.set_pet_food(donor, true).await;
    db.rollups.warehouse().refresh_month(2024, 5).await.unwrap();

    let after = db.stores.rollup.warehouse_monthly(2024, 5).await.unwrap().unwrap();
    assert_eq!((after.donations, after.pet_food), (0, 25));
    assert_eq!(
        after.donations + after.pet_food,
        before.donations + before.pet_food
    );

    let donors = db.stores.rollup.donor_monthly(2024, 5).await.unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!((donors[0].donations, donors[0].pet_food), (0, 25));
    assert_eq!(donors[0].donations + donors[0].pet_food, 25);
}

#[tokio::test]
async fn test_warehouse_refresh_replaces_stale_donor_rows() {
    let db = TestDb::new().await;
    let first = db.insert_donor("First", false).await;
    let second = db.insert_donor("Second", false).await;
    let gone = db.insert_donation(date(2024, 6, 3), first, 10).await;
    db.insert_donation(date(2024, 6, 4), second, 15).await;

    db.rollups.warehouse().refresh_month(2024, 6).await.unwrap();
    assert_eq!(db.stores.rollup.donor_monthly(2024, 6).await.unwrap().len(), 2);

    db.move_row(SourceTable::Donations, gone, date(2024, 7, 1)).await;
    db.rollups.warehouse().refresh_month(2024, 6).await.unwrap();

    let donors = db.stores.rollup.donor_monthly(2024, 6).await.unwrap();
    assert_eq!(donors.len(), 1);
    assert_eq!(donors[0].donor_id, second);
    let monthly = db.stores.rollup.warehouse_monthly(2024, 6).await.unwrap().unwrap();
    assert_eq!(monthly.donations, 15);
}

#[tokio::test]
async fn test_refreshes_run_on_spawned_tasks() {
    let db = TestDb::new().await;
    let donor = db.insert_donor("Grocer", false).await;
    db.insert_donation(date(2024, 3, 2), donor, 40).await;
    db.insert_visit(date(2024, 3, 5), 1, 2, 6).await;

    let rollups = db.rollups.clone();
    tokio::spawn(async move {
        rollups.warehouse().refresh_month(2024, 3).await.unwrap();
        rollups.pantry().rebuild_month(2024, 3).await.unwrap();
        rollups.pantry().refresh_year(2024).await.unwrap();
    })
    .await
    .unwrap();

    let store = &db.stores.rollup;
    let warehouse = store.warehouse_monthly(2024, 3).await.unwrap().unwrap();
    assert_eq!(warehouse.donations, 40);
    let yearly = store.pantry_yearly(2024).await.unwrap().unwrap();
    assert_eq!(yearly.totals.people, 3);
}

#[tokio::test]
async fn test_sunshine_month_sums_bags() {
    let db = TestDb::new().await;
    db.insert_sunshine(date(2024, 8, 1), 3, 12).await;
    db.insert_sunshine(date(2024, 8, 31), 2, 8).await;
    db.insert_sunshine(date(2024, 9, 1), 50, 500).await;

    db.rollups.sunshine().refresh_month(2024, 8).await.unwrap();

    let monthly = db.stores.rollup.sunshine_monthly(2024, 8).await.unwrap().unwrap();
    assert_eq!(monthly.totals.orders, 5);
    assert_eq!(monthly.totals.weight, 20);
}

// ============================================================================
// Write hooks
// ============================================================================

#[tokio::test]
async fn test_visit_hook_refreshes_week_month_and_year() {
    let db = TestDb::new().await;
    db.insert_visit(date(2024, 4, 3), 2, 3, 25).await;

    db.rollups
        .after_write(&SourceChange::inserted(SourceTable::ClientVisits, date(2024, 4, 3)))
        .await
        .unwrap();

    let store = &db.stores.rollup;
    assert_eq!(store.weekly_for_month(2024, 4).await.unwrap().len(), 1);
    assert_eq!(store.pantry_monthly(2024, 4).await.unwrap().unwrap().totals.people, 5);
    assert_eq!(store.pantry_yearly(2024).await.unwrap().unwrap().totals.weight, 25);
}

#[tokio::test]
async fn test_cross_month_edit_refreshes_both_months() {
    let db = TestDb::new().await;
    // Friday of March 2024's fourth week
    db.insert_visit(date(2024, 3, 29), 1, 1, 10).await;
    db.rollups
        .after_write(&SourceChange::inserted(SourceTable::ClientVisits, date(2024, 3, 29)))
        .await
        .unwrap();
    let store = &db.stores.rollup;
    assert_eq!(store.pantry_monthly(2024, 3).await.unwrap().unwrap().totals.orders, 1);

    db.move_row(SourceTable::ClientVisits, 1, date(2024, 4, 2)).await;
    db.rollups
        .after_write(&SourceChange::updated(
            SourceTable::ClientVisits,
            date(2024, 3, 29),
            date(2024, 4, 2),
        ))
        .await
        .unwrap();

    assert_eq!(store.pantry_monthly(2024, 3).await.unwrap().unwrap().totals.orders, 0);
    assert_eq!(store.pantry_monthly(2024, 4).await.unwrap().unwrap().totals.orders, 1);
    assert_eq!(store.pantry_yearly(2024).await.unwrap().unwrap().totals.orders, 1);
}

#[tokio::test]
async fn test_sunshine_hook_refreshes_pantry_and_sunshine() {
    let db = TestDb::new().await;
    db.insert_sunshine(date(2024, 4, 10), 4, 16).await;

    db.rollups
        .after_write(&SourceChange::inserted(SourceTable::SunshineBagLog, date(2024, 4, 10)))
        .await
        .unwrap();

    let store = &db.stores.rollup;
    let pantry = store.pantry_monthly(2024, 4).await.unwrap().unwrap();
    assert_eq!(pantry.totals.orders, 4);
    assert_eq!(pantry.totals.people, 0);
    assert_eq!(pantry.totals.weight, 16);
    let sunshine = store.sunshine_monthly(2024, 4).await.unwrap().unwrap();
    assert_eq!(sunshine.totals.orders, 4);
}

#[tokio::test]
async fn test_donation_delete_hook_refreshes_warehouse() {
    let db = TestDb::new().await;
    let donor = db.insert_donor("Bakery", false).await;
    db.insert_donation(date(2024, 2, 14), donor, 60).await;
    db.rollups
        .after_write(&SourceChange::inserted(SourceTable::Donations, date(2024, 2, 14)))
        .await
        .unwrap();
    assert_eq!(
        db.stores.rollup.warehouse_monthly(2024, 2).await.unwrap().unwrap().donations,
        60
    );

    sqlx::query("DELETE FROM donations")
        .execute(&db.pool)
        .await
        .unwrap();
    db.rollups
        .after_write(&SourceChange::deleted(SourceTable::Donations, date(2024, 2, 14)))
        .await
        .unwrap();

    let monthly = db.stores.rollup.warehouse_monthly(2024, 2).await.unwrap().unwrap();
    assert_eq!(monthly.donations, 0);
    assert!(db.stores.rollup.donor_monthly(2024, 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_hook_touches_nothing() {
    let db = TestDb::new().await;
    db.insert_booking(date(2024, 4, 3)).await;

    db.rollups
        .after_write(&SourceChange::inserted(SourceTable::Bookings, date(2024, 4, 3)))
        .await
        .unwrap();

    assert_eq!(db.count("pantry_weekly_overall").await, 0);
    assert_eq!(db.count("pantry_monthly_overall").await, 0);
}
