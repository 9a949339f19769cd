//! MapCountry ledger operations. A (map, country) pair moves between two
//! states only: absent, or visited with a count of at least one. Re-visits
//! increment the count in place; removal deletes the row outright.
//!
//! None of these operations refresh the map's derived counters. Callers
//! trigger `map::update_map_metrics` once their mutation sequence is done.

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use super::{country, ServiceError};
use crate::models::country::Country;
use crate::models::map_country::{MapCountry, NewMapCountry, VisitedCountry};
use crate::schema::{countries, map_countries, maps};

/// What the upsert does with a (map, country) pair, decided from the row
/// found (or not found) by the locked lookup
#[derive(Debug)]
enum VisitAction {
    First(NewMapCountry),
    Revisit { entry_id: i32, new_count: i32 },
}

fn plan_visit(
    map_id: i32,
    country_id: i32,
    existing: Option<&MapCountry>,
    now: NaiveDateTime,
) -> VisitAction {
    match existing {
        Some(entry) => VisitAction::Revisit {
            entry_id: entry.id,
            new_count: entry.visit_count + 1,
        },
        None => VisitAction::First(NewMapCountry::first_visit(map_id, country_id, now)),
    }
}

/// Record a visit: insert a fresh row on first visit, otherwise increment
/// `visit_count` and refresh `last_visit` on the existing row.
pub async fn add_country_to_map(
    conn: &mut AsyncPgConnection,
    map_id: i32,
    country_id: i32,
) -> Result<MapCountry, ServiceError> {
    let map_exists: i64 = maps::table
        .filter(maps::id.eq(map_id))
        .count()
        .get_result(conn)
        .await?;
    if map_exists == 0 {
        return Err(ServiceError::map_not_found());
    }

    if !country::country_exists(conn, country_id).await? {
        return Err(ServiceError::country_not_found(country_id));
    }

    // Row lock so two concurrent visits to the same country serialize on
    // the check-then-increment instead of losing an update.
    let existing = map_countries::table
        .filter(map_countries::map_id.eq(map_id))
        .filter(map_countries::country_id.eq(country_id))
        .for_update()
        .first::<MapCountry>(conn)
        .await
        .optional()?;

    let now = Utc::now().naive_utc();

    let entry = match plan_visit(map_id, country_id, existing.as_ref(), now) {
        VisitAction::Revisit {
            entry_id,
            new_count,
        } => {
            let updated = diesel::update(map_countries::table.find(entry_id))
                .set((
                    map_countries::visit_count.eq(new_count),
                    map_countries::last_visit.eq(now),
                ))
                .get_result::<MapCountry>(conn)
                .await?;
            debug!(
                map_id,
                country_id,
                visit_count = updated.visit_count,
                "Incremented visit count"
            );
            updated
        }
        VisitAction::First(row) => {
            // The lock above cannot cover a row that does not exist yet, so
            // two concurrent first visits may both reach this insert. The
            // loser lands on the winner's row and turns into an increment;
            // `first_visited` stays as the winner wrote it.
            let created = diesel::insert_into(map_countries::table)
                .values(row)
                .on_conflict((map_countries::map_id, map_countries::country_id))
                .do_update()
                .set((
                    map_countries::visit_count.eq(map_countries::visit_count + 1),
                    map_countries::last_visit.eq(now),
                ))
                .get_result::<MapCountry>(conn)
                .await?;
            debug!(map_id, country_id, "Recorded first visit");
            created
        }
    };

    Ok(entry)
}

/// All visited-country rows for a map, with country detail. An empty ledger
/// reads as not found; existing clients depend on the 404, even though the
/// other list endpoints return empty lists.
pub async fn get_countries_by_map(
    conn: &mut AsyncPgConnection,
    map_id: i32,
) -> Result<Vec<VisitedCountry>, ServiceError> {
    let rows: Vec<(MapCountry, Country)> = map_countries::table
        .inner_join(countries::table)
        .filter(map_countries::map_id.eq(map_id))
        .select((MapCountry::as_select(), Country::as_select()))
        .load(conn)
        .await?;

    if rows.is_empty() {
        return Err(ServiceError::map_not_found());
    }

    Ok(rows.into_iter().map(VisitedCountry::from).collect())
}

/// Delete the ledger row for a (map, country) pair. A later visit to the
/// same country starts over as a first visit.
pub async fn remove_country_from_map(
    conn: &mut AsyncPgConnection,
    map_id: i32,
    country_id: i32,
) -> Result<(), ServiceError> {
    let deleted = diesel::delete(
        map_countries::table
            .filter(map_countries::map_id.eq(map_id))
            .filter(map_countries::country_id.eq(country_id)),
    )
    .execute(conn)
    .await?;

    if deleted == 0 {
        return Err(ServiceError::map_country_not_found(country_id));
    }

    debug!(map_id, country_id, "Removed country from map");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ledger_row(id: i32, map_id: i32, country_id: i32, visit_count: i32) -> MapCountry {
        let first = Utc::now().naive_utc() - Duration::days(30);
        MapCountry {
            id,
            map_id,
            country_id,
            visit_count,
            first_visited: first,
            last_visit: first + Duration::days(7),
        }
    }

    #[test]
    fn absent_pair_plans_a_first_visit() {
        let now = Utc::now().naive_utc();
        match plan_visit(3, 42, None, now) {
            VisitAction::First(row) => {
                assert_eq!(row.map_id, 3);
                assert_eq!(row.country_id, 42);
                assert_eq!(row.visit_count, 1);
                assert_eq!(row.first_visited, now);
                assert_eq!(row.last_visit, now);
            }
            other => panic!("expected a first visit, got {:?}", other),
        }
    }

    #[test]
    fn existing_pair_plans_an_increment_on_the_same_row() {
        let entry = ledger_row(7, 3, 42, 2);
        let now = Utc::now().naive_utc();
        match plan_visit(3, 42, Some(&entry), now) {
            VisitAction::Revisit {
                entry_id,
                new_count,
            } => {
                // Targets the row that already exists, never a duplicate
                assert_eq!(entry_id, 7);
                assert_eq!(new_count, 3);
            }
            other => panic!("expected an increment, got {:?}", other),
        }
    }

    #[test]
    fn pair_removed_from_the_ledger_starts_over_at_one() {
        // After removal the lookup finds nothing, so the next visit is a
        // first visit again regardless of earlier history
        let now = Utc::now().naive_utc();
        match plan_visit(3, 42, None, now) {
            VisitAction::First(row) => assert_eq!(row.visit_count, 1),
            other => panic!("expected a first visit, got {:?}", other),
        }
    }
}
