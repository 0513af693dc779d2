//! Scheduled cleanup jobs.
//!
//! A [`JobRunner`] drives one [`RecurringJob`] on a fixed interval. Each tick
//! evaluates the job's guard and runs it when due. A tick that arrives while
//! the previous run is still active is skipped. Failures are logged and the
//! loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::interfaces::StorageError;
use crate::rollup::RollupError;

pub mod pantry_retention;
pub mod warehouse_cleanup;

pub use pantry_retention::PantryRetentionJob;
pub use warehouse_cleanup::WarehouseCleanupJob;

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

/// Errors that can occur while running a job.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Retention must keep at least one year, got {0}")]
    InvalidRetentionYears(u32),

    #[error("No cutoff date for year {0}")]
    InvalidCutoff(i32),

    #[error(transparent)]
    Rollup(#[from] RollupError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What a completed job run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub cutoff: NaiveDate,
    pub months_refreshed: usize,
    pub rows_deleted: u64,
}

/// A cleanup task with an idempotent guard.
#[async_trait]
pub trait RecurringJob: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether anything is left to clean up as of `today`.
    async fn is_due(&self, today: NaiveDate) -> Result<bool>;

    /// Refresh affected aggregates, then delete aged rows.
    async fn run(&self, today: NaiveDate) -> Result<JobOutcome>;
}

/// Result of a single runner tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous run still holds the job.
    Overlapping,
    NotDue,
    Completed(JobOutcome),
    Failed,
}

/// Runs a job on an interval, never concurrently with itself.
#[derive(Clone)]
pub struct JobRunner {
    job: Arc<dyn RecurringJob>,
    interval: Duration,
    running: Arc<Mutex<()>>,
}

impl JobRunner {
    /// Create a runner ticking hourly.
    pub fn new(job: Arc<dyn RecurringJob>) -> Self {
        Self {
            job,
            interval: Duration::from_secs(3600),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Set custom tick interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn job_name(&self) -> &'static str {
        self.job.name()
    }

    /// Evaluate the guard and run the job if due.
    pub async fn tick(&self, today: NaiveDate) -> TickOutcome {
        let job = self.job.name();

        let Ok(_guard) = self.running.try_lock() else {
            debug!(job, "previous run still active, skipping tick");
            return TickOutcome::Overlapping;
        };

        match self.job.is_due(today).await {
            Ok(false) => {
                debug!(job, %today, "nothing to clean up");
                return TickOutcome::NotDue;
            }
            Ok(true) => {}
            Err(e) => {
                error!(job, error = %e, "job guard check failed");
                return TickOutcome::Failed;
            }
        }

        match self.job.run(today).await {
            Ok(outcome) => {
                info!(
                    job,
                    cutoff = %outcome.cutoff,
                    months_refreshed = outcome.months_refreshed,
                    rows_deleted = outcome.rows_deleted,
                    "cleanup job completed"
                );
                TickOutcome::Completed(outcome)
            }
            Err(e) => {
                error!(job, error = %e, "cleanup job failed");
                TickOutcome::Failed
            }
        }
    }

    /// Spawn the runner as a background task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            info!(
                job = self.job.name(),
                interval_secs = self.interval.as_secs(),
                "job runner started"
            );

            loop {
                interval.tick().await;

                // Overlapping runs are rejected by the lock in `tick`
                let runner = self.clone();
                tokio::spawn(async move {
                    runner.tick(chrono::Local::now().date_naive()).await;
                });
            }
        })
    }
}
