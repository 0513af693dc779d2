//! Tables a purge may touch.

use std::collections::BTreeMap;

use super::validation::{normalize_table_name, validate_table_name};
use super::PurgeError;
use crate::interfaces::PurgeTarget;
use crate::model::AggregationDomain;
use crate::storage::schema::{DateColumn, SourceTable};

/// One purgeable table: where its dates live and which aggregates it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowListEntry {
    pub table: SourceTable,
    pub date_column: DateColumn,
    /// `None` for tables no aggregate is computed from.
    pub domain: Option<AggregationDomain>,
}

impl AllowListEntry {
    pub fn new(table: SourceTable) -> Self {
        Self {
            table,
            date_column: table.date_column(),
            domain: domain_of(table),
        }
    }

    pub fn target(&self) -> PurgeTarget {
        PurgeTarget {
            table: self.table,
            date_column: self.date_column,
        }
    }
}

/// The aggregation domain a source table feeds.
pub fn domain_of(table: SourceTable) -> Option<AggregationDomain> {
    match table {
        SourceTable::ClientVisits => Some(AggregationDomain::Pantry),
        SourceTable::Donations
        | SourceTable::SurplusLog
        | SourceTable::PigPoundLog
        | SourceTable::OutgoingDonationLog => Some(AggregationDomain::Warehouse),
        SourceTable::SunshineBagLog => Some(AggregationDomain::Sunshine),
        SourceTable::Bookings | SourceTable::VolunteerBookings => None,
    }
}

/// Immutable name → entry map consulted before every purge.
#[derive(Debug, Clone)]
pub struct AllowList {
    entries: BTreeMap<&'static str, AllowListEntry>,
}

impl AllowList {
    /// Every known source table.
    pub fn standard() -> Self {
        Self::from_tables(SourceTable::ALL)
    }

    pub fn from_tables(tables: impl IntoIterator<Item = SourceTable>) -> Self {
        let entries = tables
            .into_iter()
            .map(|table| (table.name(), AllowListEntry::new(table)))
            .collect();
        Self { entries }
    }

    /// Restrict the list to the named tables. Unknown names are rejected.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PurgeError> {
        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let name = normalize_table_name(name.as_ref());
            validate_table_name(&name)?;
            let table =
                SourceTable::from_name(&name).ok_or(PurgeError::TableNotAllowed(name))?;
            tables.push(table);
        }
        Ok(Self::from_tables(tables))
    }

    pub fn get(&self, name: &str) -> Option<&AllowListEntry> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &AllowListEntry> {
        self.entries.values()
    }

    /// Normalize, validate and deduplicate requested names, keeping the
    /// order of first appearance.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<AllowListEntry>, PurgeError> {
        let mut resolved: Vec<AllowListEntry> = Vec::with_capacity(names.len());

        for raw in names {
            let name = normalize_table_name(raw.as_ref());
            validate_table_name(&name)?;
            let entry = self
                .entries
                .get(name.as_str())
                .ok_or_else(|| PurgeError::TableNotAllowed(name.clone()))?;
            if !resolved.iter().any(|e| e.table == entry.table) {
                resolved.push(*entry);
            }
        }

        if resolved.is_empty() {
            return Err(PurgeError::NoTables);
        }
        Ok(resolved)
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::standard()
    }
}
