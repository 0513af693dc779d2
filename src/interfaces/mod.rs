//! Abstract interfaces for the rollup engine.
//!
//! These traits define the contracts for:
//! - Rollup storage (source sums, aggregate upserts and reads)
//! - Retention storage (month discovery, transactional purge, reclamation)

pub mod retention_store;
pub mod rollup_store;

pub use retention_store::{PurgePlan, PurgeTarget, RetentionStore};
pub use rollup_store::{Result, RollupStore, StorageError};
