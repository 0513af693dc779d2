//! Foodbank Rollup - aggregation and retention engine
//!
//! Maintains weekly, monthly and yearly summaries of food-bank operations
//! data (pantry visits, warehouse logs, sunshine bags) and purges aged
//! source rows once their summaries are safely stored.

pub mod calendar;
pub mod config;
pub mod interfaces;
pub mod jobs;
pub mod model;
pub mod retention;
pub mod rollup;
pub mod storage;
pub mod utils;
