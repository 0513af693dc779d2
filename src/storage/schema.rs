//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! Source tables that can be purged are additionally named by [`SourceTable`],
//! a closed set used wherever a table is chosen at runtime.

use sea_query::Iden;
use serde::Serialize;

/// Source tables known to the retention layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    ClientVisits,
    Bookings,
    Donations,
    SurplusLog,
    PigPoundLog,
    OutgoingDonationLog,
    SunshineBagLog,
    VolunteerBookings,
}

impl SourceTable {
    pub const ALL: [SourceTable; 8] = [
        SourceTable::ClientVisits,
        SourceTable::Bookings,
        SourceTable::Donations,
        SourceTable::SurplusLog,
        SourceTable::PigPoundLog,
        SourceTable::OutgoingDonationLog,
        SourceTable::SunshineBagLog,
        SourceTable::VolunteerBookings,
    ];

    /// SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            SourceTable::ClientVisits => "client_visits",
            SourceTable::Bookings => "bookings",
            SourceTable::Donations => "donations",
            SourceTable::SurplusLog => "surplus_log",
            SourceTable::PigPoundLog => "pig_pound_log",
            SourceTable::OutgoingDonationLog => "outgoing_donation_log",
            SourceTable::SunshineBagLog => "sunshine_bag_log",
            SourceTable::VolunteerBookings => "volunteer_bookings",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.name() == name)
    }

    /// Column holding the row's business date.
    pub fn date_column(&self) -> DateColumn {
        match self {
            SourceTable::VolunteerBookings => DateColumn::ShiftDate,
            _ => DateColumn::Date,
        }
    }
}

impl Iden for SourceTable {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let _ = s.write_str(self.name());
    }
}

/// Date columns used by source tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateColumn {
    Date,
    ShiftDate,
}

impl Iden for DateColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        let name = match self {
            DateColumn::Date => "date",
            DateColumn::ShiftDate => "shift_date",
        };
        let _ = s.write_str(name);
    }
}

/// Columns shared by every weight-only warehouse log and by donations.
#[derive(Iden)]
pub enum WeightLog {
    #[iden = "date"]
    Date,
    #[iden = "weight"]
    Weight,
}

/// Client visits table schema.
#[derive(Iden)]
pub enum ClientVisits {
    #[iden = "client_visits"]
    Table,
    #[iden = "id"]
    Id,
    #[iden = "date"]
    Date,
    #[iden = "adults"]
    Adults,
    #[iden = "children"]
    Children,
    #[iden = "weight"]
    Weight,
}

/// Sunshine bag log schema.
#[derive(Iden)]
pub enum SunshineBagLog {
    #[iden = "sunshine_bag_log"]
    Table,
    #[iden = "date"]
    Date,
    #[iden = "client_count"]
    ClientCount,
    #[iden = "weight"]
    Weight,
}

/// Volunteer archive schema.
#[derive(Iden)]
pub enum VolunteerArchive {
    #[iden = "volunteer_archive"]
    Table,
    #[iden = "volunteer_id"]
    VolunteerId,
    #[iden = "hours"]
    Hours,
    #[iden = "shifts"]
    Shifts,
    #[iden = "bookings"]
    Bookings,
    #[iden = "no_shows"]
    NoShows,
    #[iden = "early_bird"]
    EarlyBird,
}

/// Pantry weekly aggregate schema.
#[derive(Iden)]
pub enum PantryWeeklyOverall {
    #[iden = "pantry_weekly_overall"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "week"]
    Week,
    #[iden = "start_date"]
    StartDate,
    #[iden = "end_date"]
    EndDate,
    #[iden = "orders"]
    Orders,
    #[iden = "adults"]
    Adults,
    #[iden = "children"]
    Children,
    #[iden = "people"]
    People,
    #[iden = "weight"]
    Weight,
}

/// Pantry monthly aggregate schema.
#[derive(Iden)]
pub enum PantryMonthlyOverall {
    #[iden = "pantry_monthly_overall"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "orders"]
    Orders,
    #[iden = "adults"]
    Adults,
    #[iden = "children"]
    Children,
    #[iden = "people"]
    People,
    #[iden = "weight"]
    Weight,
}

/// Pantry yearly aggregate schema.
#[derive(Iden)]
pub enum PantryYearlyOverall {
    #[iden = "pantry_yearly_overall"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "orders"]
    Orders,
    #[iden = "adults"]
    Adults,
    #[iden = "children"]
    Children,
    #[iden = "people"]
    People,
    #[iden = "weight"]
    Weight,
}

/// Warehouse monthly aggregate schema.
#[derive(Iden)]
pub enum WarehouseMonthlyOverall {
    #[iden = "warehouse_monthly_overall"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "donations"]
    Donations,
    #[iden = "pet_food"]
    PetFood,
    #[iden = "surplus"]
    Surplus,
    #[iden = "pig_pound"]
    PigPound,
    #[iden = "outgoing_donations"]
    OutgoingDonations,
}

/// Per-donor monthly aggregate schema.
#[derive(Iden)]
pub enum DonorMonthlyAggregations {
    #[iden = "donor_monthly_aggregations"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "donor_id"]
    DonorId,
    #[iden = "donations"]
    Donations,
    #[iden = "pet_food"]
    PetFood,
}

/// Sunshine bag monthly aggregate schema.
#[derive(Iden)]
pub enum SunshineBagMonthlyOverall {
    #[iden = "sunshine_bag_monthly_overall"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "orders"]
    Orders,
    #[iden = "weight"]
    Weight,
}

/// Purged pantry-week share, kept so weeks can be recomputed after a purge.
#[derive(Iden)]
pub enum PantryWeeklyRetained {
    #[iden = "pantry_weekly_retained"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "week"]
    Week,
    #[iden = "orders"]
    Orders,
    #[iden = "adults"]
    Adults,
    #[iden = "children"]
    Children,
    #[iden = "people"]
    People,
    #[iden = "weight"]
    Weight,
}

/// Purged warehouse log weights per month.
#[derive(Iden)]
pub enum WarehouseMonthlyRetained {
    #[iden = "warehouse_monthly_retained"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "surplus"]
    Surplus,
    #[iden = "pig_pound"]
    PigPound,
    #[iden = "outgoing_donations"]
    OutgoingDonations,
}

/// Purged donation weight per donor and month, before the pet-food split.
#[derive(Iden)]
pub enum DonorMonthlyRetained {
    #[iden = "donor_monthly_retained"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "donor_id"]
    DonorId,
    #[iden = "weight"]
    Weight,
}

/// Purged sunshine bag totals per month.
#[derive(Iden)]
pub enum SunshineBagMonthlyRetained {
    #[iden = "sunshine_bag_monthly_retained"]
    Table,
    #[iden = "year"]
    Year,
    #[iden = "month"]
    Month,
    #[iden = "orders"]
    Orders,
    #[iden = "weight"]
    Weight,
}

/// SQL for creating the source tables.
pub const CREATE_SOURCE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS donors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    is_pet_food INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS client_visits (
    id INTEGER PRIMARY KEY,
    client_id INTEGER,
    date TEXT NOT NULL,
    adults INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_client_visits_date ON client_visits(date);

CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY,
    client_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'approved'
);
CREATE INDEX IF NOT EXISTS idx_bookings_date ON bookings(date);

CREATE TABLE IF NOT EXISTS donations (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    donor_id INTEGER NOT NULL REFERENCES donors(id),
    weight INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_donations_date ON donations(date);

CREATE TABLE IF NOT EXISTS surplus_log (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    weight INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS pig_pound_log (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    weight INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS outgoing_donation_log (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    receiver TEXT NOT NULL DEFAULT '',
    weight INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS sunshine_bag_log (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    client_count INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_sunshine_bag_log_date ON sunshine_bag_log(date);

CREATE TABLE IF NOT EXISTS volunteer_bookings (
    id INTEGER PRIMARY KEY,
    volunteer_id INTEGER NOT NULL,
    shift_date TEXT NOT NULL,
    start_time TEXT NOT NULL DEFAULT '09:00',
    hours REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'approved'
);
CREATE INDEX IF NOT EXISTS idx_volunteer_bookings_shift_date ON volunteer_bookings(shift_date);

CREATE TABLE IF NOT EXISTS volunteer_archive (
    volunteer_id INTEGER PRIMARY KEY,
    hours REAL NOT NULL DEFAULT 0,
    shifts INTEGER NOT NULL DEFAULT 0,
    bookings INTEGER NOT NULL DEFAULT 0,
    no_shows INTEGER NOT NULL DEFAULT 0,
    early_bird INTEGER NOT NULL DEFAULT 0
);
"#;

/// SQL for creating the aggregate tables.
pub const CREATE_AGGREGATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS pantry_weekly_overall (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    week INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    orders INTEGER NOT NULL DEFAULT 0,
    adults INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    people INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month, week)
);

CREATE TABLE IF NOT EXISTS pantry_monthly_overall (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    orders INTEGER NOT NULL DEFAULT 0,
    adults INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    people INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month)
);

CREATE TABLE IF NOT EXISTS pantry_yearly_overall (
    year INTEGER PRIMARY KEY,
    orders INTEGER NOT NULL DEFAULT 0,
    adults INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    people INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS warehouse_monthly_overall (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    donations INTEGER NOT NULL DEFAULT 0,
    pet_food INTEGER NOT NULL DEFAULT 0,
    surplus INTEGER NOT NULL DEFAULT 0,
    pig_pound INTEGER NOT NULL DEFAULT 0,
    outgoing_donations INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month)
);

CREATE TABLE IF NOT EXISTS donor_monthly_aggregations (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    donor_id INTEGER NOT NULL,
    donations INTEGER NOT NULL DEFAULT 0,
    pet_food INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month, donor_id)
);

CREATE TABLE IF NOT EXISTS sunshine_bag_monthly_overall (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    orders INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month)
);

-- Contributions of purged source rows. Refreshes add these to whatever
-- source rows remain, so recomputing a period never drops purged data.
CREATE TABLE IF NOT EXISTS pantry_weekly_retained (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    week INTEGER NOT NULL,
    orders INTEGER NOT NULL DEFAULT 0,
    adults INTEGER NOT NULL DEFAULT 0,
    children INTEGER NOT NULL DEFAULT 0,
    people INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month, week)
);

CREATE TABLE IF NOT EXISTS warehouse_monthly_retained (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    surplus INTEGER NOT NULL DEFAULT 0,
    pig_pound INTEGER NOT NULL DEFAULT 0,
    outgoing_donations INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month)
);

CREATE TABLE IF NOT EXISTS donor_monthly_retained (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    donor_id INTEGER NOT NULL,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month, donor_id)
);

CREATE TABLE IF NOT EXISTS sunshine_bag_monthly_retained (
    year INTEGER NOT NULL,
    month INTEGER NOT NULL,
    orders INTEGER NOT NULL DEFAULT 0,
    weight INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (year, month)
);
"#;
