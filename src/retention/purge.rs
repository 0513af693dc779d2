//! Purge orchestration.
//!
//! A purge runs in four phases:
//! 1. Validate the cutoff and resolve requested tables against the allow-list.
//! 2. Discover the months each table still holds before the cutoff.
//! 3. Rebuild the aggregates those months feed from source. Pantry weeks are
//!    rebuilt too, including the week spilling in from the previous month.
//! 4. Delete every requested table's aged rows in one transaction. Each
//!    table's share is folded first: volunteer bookings into the archive,
//!    aggregate-feeding rows into the retained tables.
//!
//! Storage reclamation follows the commit, runs once, and is best-effort.
//! Aggregates refreshed in phase 3 stay refreshed if phase 4 fails.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::allow_list::{AllowList, AllowListEntry};
use super::validation::validate_cutoff;
use super::Result;
use crate::interfaces::{PurgePlan, RetentionStore};
use crate::model::AggregationDomain;
use crate::rollup::RollupEngine;
use crate::storage::schema::SourceTable;

/// Tables to purge and the cutoff; rows dated strictly before `before` go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PurgeRequest {
    pub tables: Vec<String>,
    pub before: NaiveDate,
}

impl PurgeRequest {
    pub fn new<S: Into<String>>(tables: impl IntoIterator<Item = S>, before: NaiveDate) -> Self {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            before,
        }
    }
}

/// Outcome for one purged table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgedTable {
    pub table: SourceTable,
    /// Month starts that held rows before the cutoff.
    pub months: Vec<NaiveDate>,
    pub rows_deleted: u64,
}

/// Audit record of a completed purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub cutoff: NaiveDate,
    pub tables: Vec<PurgedTable>,
}

impl PurgeReport {
    pub fn rows_deleted(&self) -> u64 {
        self.tables.iter().map(|t| t.rows_deleted).sum()
    }
}

/// What a purge would cover for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TablePreview {
    pub table: SourceTable,
    pub domain: Option<AggregationDomain>,
    pub months: Vec<NaiveDate>,
}

/// Side-effect-free view of a purge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgePreview {
    pub cutoff: NaiveDate,
    pub tables: Vec<TablePreview>,
}

/// Validated request with discovered months.
struct Discovery {
    cutoff: NaiveDate,
    tables: Vec<(AllowListEntry, Vec<NaiveDate>)>,
}

impl Discovery {
    /// Discovered months unioned per aggregation domain.
    fn months_by_domain(&self) -> BTreeMap<AggregationDomain, BTreeSet<NaiveDate>> {
        let mut by_domain: BTreeMap<AggregationDomain, BTreeSet<NaiveDate>> = BTreeMap::new();
        for (entry, months) in &self.tables {
            if let Some(domain) = entry.domain {
                by_domain
                    .entry(domain)
                    .or_default()
                    .extend(months.iter().copied());
            }
        }
        by_domain
    }
}

/// Runs purges against an allow-list.
pub struct PurgeOrchestrator {
    allow_list: AllowList,
    retention: Arc<dyn RetentionStore>,
    rollups: RollupEngine,
}

impl PurgeOrchestrator {
    pub fn new(
        allow_list: AllowList,
        retention: Arc<dyn RetentionStore>,
        rollups: RollupEngine,
    ) -> Self {
        Self {
            allow_list,
            retention,
            rollups,
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    /// Purge using today's local date for the cutoff check.
    pub async fn purge(&self, request: &PurgeRequest) -> Result<PurgeReport> {
        self.purge_as_of(request, chrono::Local::now().date_naive()).await
    }

    /// Purge as if today were `today`.
    pub async fn purge_as_of(
        &self,
        request: &PurgeRequest,
        today: NaiveDate,
    ) -> Result<PurgeReport> {
        let discovery = self.discover(request, today).await?;
        let cutoff = discovery.cutoff;

        for (domain, months) in discovery.months_by_domain() {
            self.rollups.refresh_before_purge(domain, &months).await?;
        }

        let plan = PurgePlan {
            cutoff,
            targets: discovery.tables.iter().map(|(e, _)| e.target()).collect(),
        };
        let deleted = self.retention.purge(&plan).await?;

        let tables: Vec<PurgedTable> = discovery
            .tables
            .into_iter()
            .zip(deleted)
            .map(|((entry, months), rows_deleted)| PurgedTable {
                table: entry.table,
                months,
                rows_deleted,
            })
            .collect();

        let shrunk: Vec<SourceTable> = tables
            .iter()
            .filter(|t| t.rows_deleted > 0)
            .map(|t| t.table)
            .collect();
        if let Err(e) = self.retention.reclaim_storage(&shrunk).await {
            warn!(tables = ?shrunk, error = %e, "storage reclamation failed");
        }

        let report = PurgeReport { cutoff, tables };
        info!(
            %cutoff,
            tables = report.tables.len(),
            rows_deleted = report.rows_deleted(),
            "purge complete"
        );
        Ok(report)
    }

    /// Validate and discover without touching anything.
    pub async fn preview(&self, request: &PurgeRequest) -> Result<PurgePreview> {
        self.preview_as_of(request, chrono::Local::now().date_naive()).await
    }

    pub async fn preview_as_of(
        &self,
        request: &PurgeRequest,
        today: NaiveDate,
    ) -> Result<PurgePreview> {
        let discovery = self.discover(request, today).await?;
        Ok(PurgePreview {
            cutoff: discovery.cutoff,
            tables: discovery
                .tables
                .into_iter()
                .map(|(entry, months)| TablePreview {
                    table: entry.table,
                    domain: entry.domain,
                    months,
                })
                .collect(),
        })
    }

    /// Reclaim storage for allow-listed tables.
    pub async fn reclaim<S: AsRef<str>>(&self, tables: &[S]) -> Result<Vec<SourceTable>> {
        let reclaimed: Vec<SourceTable> = self
            .allow_list
            .resolve(tables)?
            .into_iter()
            .map(|entry| entry.table)
            .collect();
        self.retention.reclaim_storage(&reclaimed).await?;
        Ok(reclaimed)
    }

    async fn discover(&self, request: &PurgeRequest, today: NaiveDate) -> Result<Discovery> {
        validate_cutoff(request.before, today)?;
        let entries = self.allow_list.resolve(&request.tables)?;

        let mut tables = Vec::with_capacity(entries.len());
        for entry in entries {
            let months = self
                .retention
                .months_before(entry.target(), request.before)
                .await?;
            tables.push((entry, months));
        }

        Ok(Discovery {
            cutoff: request.before,
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_by_domain_unions_tables() {
        let list = AllowList::standard();
        let entry = |name: &str| *list.get(name).unwrap();
        let discovery = Discovery {
            cutoff: date(2024, 1, 1),
            tables: vec![
                (entry("donations"), vec![date(2023, 1, 1), date(2023, 2, 1)]),
                (entry("surplus_log"), vec![date(2023, 2, 1), date(2023, 3, 1)]),
                (entry("bookings"), vec![date(2023, 4, 1)]),
                (entry("sunshine_bag_log"), vec![date(2023, 5, 1)]),
            ],
        };

        let by_domain = discovery.months_by_domain();
        assert_eq!(by_domain.len(), 2);
        assert_eq!(
            by_domain[&AggregationDomain::Warehouse],
            BTreeSet::from([date(2023, 1, 1), date(2023, 2, 1), date(2023, 3, 1)])
        );
        assert_eq!(
            by_domain[&AggregationDomain::Sunshine],
            BTreeSet::from([date(2023, 5, 1)])
        );
    }

    #[test]
    fn test_report_serializes_table_names() {
        let report = PurgeReport {
            cutoff: date(2024, 1, 1),
            tables: vec![PurgedTable {
                table: SourceTable::PigPoundLog,
                months: vec![date(2023, 6, 1)],
                rows_deleted: 4,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cutoff"], "2024-01-01");
        assert_eq!(json["tables"][0]["table"], "pig_pound_log");
        assert_eq!(json["tables"][0]["months"][0], "2023-06-01");
        assert_eq!(report.rows_deleted(), 4);
    }
}
