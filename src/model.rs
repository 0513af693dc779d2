//! Aggregate rows and source totals.
//!
//! Aggregates are caches: every value here can be recomputed from source rows
//! (through the weekly layer for the pantry domain).

use chrono::NaiveDate;
use serde::Serialize;

/// Aggregation domain an allow-listed source table feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationDomain {
    Pantry,
    Warehouse,
    Sunshine,
}

impl std::fmt::Display for AggregationDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AggregationDomain::Pantry => "pantry",
            AggregationDomain::Warehouse => "warehouse",
            AggregationDomain::Sunshine => "sunshine",
        };
        f.write_str(name)
    }
}

/// Pantry counters shared by the weekly, monthly and yearly tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PantryTotals {
    pub orders: i64,
    pub adults: i64,
    pub children: i64,
    pub people: i64,
    pub weight: i64,
}

impl PantryTotals {
    /// Combine a week's visits with its sunshine bags.
    ///
    /// Sunshine bags add orders and weight but never people.
    pub fn from_sources(visits: VisitTotals, sunshine: SunshineTotals) -> Self {
        Self {
            orders: visits.visits + sunshine.orders,
            adults: visits.adults,
            children: visits.children,
            people: visits.adults + visits.children,
            weight: visits.weight + sunshine.weight,
        }
    }
}

impl std::ops::Add for PantryTotals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            orders: self.orders + rhs.orders,
            adults: self.adults + rhs.adults,
            children: self.children + rhs.children,
            people: self.people + rhs.people,
            weight: self.weight + rhs.weight,
        }
    }
}

/// Client visit sums over a date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisitTotals {
    pub visits: i64,
    pub adults: i64,
    pub children: i64,
    pub weight: i64,
}

/// Sunshine bag sums over a date window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SunshineTotals {
    /// Sum of bag client counts.
    pub orders: i64,
    pub weight: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyAggregate {
    pub year: i32,
    pub month: u32,
    pub week: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub totals: PantryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PantryMonthly {
    pub year: i32,
    pub month: u32,
    pub totals: PantryTotals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PantryYearly {
    pub year: i32,
    pub totals: PantryTotals,
}

/// One donor's donation weights over a window, split by pet-food flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DonorTotals {
    pub donor_id: i64,
    pub donations: i64,
    pub pet_food: i64,
}

/// Per-donor weights for one month, split by the donor's pet-food flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DonorMonthly {
    pub year: i32,
    pub month: u32,
    pub donor_id: i64,
    pub donations: i64,
    pub pet_food: i64,
}

/// Warehouse totals for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WarehouseMonthly {
    pub year: i32,
    pub month: u32,
    pub donations: i64,
    pub pet_food: i64,
    pub surplus: i64,
    pub pig_pound: i64,
    pub outgoing_donations: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SunshineMonthly {
    pub year: i32,
    pub month: u32,
    pub totals: SunshineTotals,
}

/// Lifetime counters kept for a volunteer after their bookings are purged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VolunteerArchive {
    pub volunteer_id: i64,
    pub hours: f64,
    pub shifts: i64,
    pub bookings: i64,
    pub no_shows: i64,
    pub early_bird: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sources_combines_orders_and_weight() {
        let visits = VisitTotals {
            visits: 3,
            adults: 4,
            children: 2,
            weight: 90,
        };
        let sunshine = SunshineTotals {
            orders: 2,
            weight: 15,
        };

        let totals = PantryTotals::from_sources(visits, sunshine);

        assert_eq!(totals.orders, 5);
        assert_eq!(totals.adults, 4);
        assert_eq!(totals.people, 6);
        assert_eq!(totals.weight, 105);
    }

    #[test]
    fn test_totals_add() {
        let a = PantryTotals {
            orders: 3,
            weight: 10,
            ..Default::default()
        };
        let b = PantryTotals {
            orders: 4,
            weight: 5,
            ..Default::default()
        };
        let sum = a + b;
        assert_eq!(sum.orders, 7);
        assert_eq!(sum.weight, 15);
    }

    #[test]
    fn test_domain_display() {
        assert_eq!(AggregationDomain::Warehouse.to_string(), "warehouse");
    }
}
