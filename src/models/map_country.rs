use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::country::Country;
use crate::schema::map_countries;

/// Ledger row recording one user's visit history to one country.
/// `(map_id, country_id)` is unique; a re-visit increments `visit_count`
/// and refreshes `last_visit` instead of inserting a second row.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = map_countries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MapCountry {
    pub id: i32,
    pub map_id: i32,
    pub country_id: i32,
    pub visit_count: i32,
    pub first_visited: NaiveDateTime,
    pub last_visit: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = map_countries)]
pub struct NewMapCountry {
    pub map_id: i32,
    pub country_id: i32,
    pub visit_count: i32,
    pub first_visited: NaiveDateTime,
    pub last_visit: NaiveDateTime,
}

impl NewMapCountry {
    /// First visit to a country: count starts at 1, both timestamps equal
    pub fn first_visit(map_id: i32, country_id: i32, now: NaiveDateTime) -> Self {
        Self {
            map_id,
            country_id,
            visit_count: 1,
            first_visited: now,
            last_visit: now,
        }
    }
}

/// Ledger row enriched with country detail for display
#[derive(Debug, Serialize, Deserialize)]
pub struct VisitedCountry {
    pub country_id: i32,
    pub country_name: String,
    pub country_iso_code: String,
    pub visit_count: i32,
    pub first_visited: NaiveDateTime,
    pub last_visit: NaiveDateTime,
}

impl From<(MapCountry, Country)> for VisitedCountry {
    fn from((entry, country): (MapCountry, Country)) -> Self {
        Self {
            country_id: country.id,
            country_name: country.name,
            country_iso_code: country.iso_code,
            visit_count: entry.visit_count,
            first_visited: entry.first_visited,
            last_visit: entry.last_visit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NewMapCountry;
    use chrono::Utc;

    #[test]
    fn first_visit_starts_with_count_one_and_equal_timestamps() {
        let now = Utc::now().naive_utc();
        let row = NewMapCountry::first_visit(3, 42, now);
        assert_eq!(row.visit_count, 1);
        assert_eq!(row.first_visited, row.last_visit);
    }
}
