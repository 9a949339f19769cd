//! Map record lifecycle. One map per user; `countries_visited` and
//! `percent_world_visited` are always recomputed from the map_countries
//! ledger and the catalog count, never adjusted incrementally, so the
//! record cannot drift from the ledger.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::debug;

use super::{country, ServiceError};
use crate::models::country::Country;
use crate::models::map::{Map, MapMetricsUpdate, NewMap};
use crate::models::map_country::{MapCountry, VisitedCountry};
use crate::schema::{countries, map_countries, maps};

/// Look up a user's map, if they have one. Pure read, no side effects.
pub async fn get_map_by_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<Option<Map>, ServiceError> {
    let map = maps::table
        .filter(maps::user_id.eq(user_id))
        .first::<Map>(conn)
        .await
        .optional()?;
    Ok(map)
}

async fn require_map(conn: &mut AsyncPgConnection, user_id: i32) -> Result<Map, ServiceError> {
    get_map_by_user(conn, user_id)
        .await?
        .ok_or_else(ServiceError::map_not_found)
}

/// Create a map with zeroed counters. Conflict if the user already has one;
/// callers that want get-or-create semantics check first.
pub async fn create_map_for_user(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<Map, ServiceError> {
    if get_map_by_user(conn, user_id).await?.is_some() {
        return Err(ServiceError::map_already_exists());
    }

    let map = diesel::insert_into(maps::table)
        .values(NewMap::for_user(user_id))
        .get_result::<Map>(conn)
        .await?;
    debug!(user_id, map_id = map.id, "Created map");
    Ok(map)
}

/// Percentage of the world covered by `visited` distinct countries
fn world_percent(visited: i64, total: i64) -> f64 {
    if total > 0 {
        visited as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

/// Recompute the derived counters from the ledger and persist them.
/// Every mutation path ends here.
pub async fn update_map_metrics(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<Map, ServiceError> {
    let map = require_map(conn, user_id).await?;

    // Distinct visited countries, counted from the source of truth
    let visited: i64 = map_countries::table
        .filter(map_countries::map_id.eq(map.id))
        .count()
        .get_result(conn)
        .await?;

    let total = country::count_all(conn).await?;

    let update = MapMetricsUpdate {
        countries_visited: visited as i32,
        percent_world_visited: world_percent(visited, total),
        last_updated: Utc::now().naive_utc(),
    };

    let map = diesel::update(maps::table.find(map.id))
        .set(&update)
        .get_result::<Map>(conn)
        .await?;
    debug!(
        user_id,
        countries_visited = map.countries_visited,
        percent_world_visited = map.percent_world_visited,
        "Refreshed map metrics"
    );
    Ok(map)
}

#[derive(Debug, Serialize)]
pub struct MapWithCountries {
    pub map: Map,
    pub visited_countries: Vec<VisitedCountry>,
}

/// Composite read: the map plus its visited countries with country detail.
/// An empty ledger yields an empty list here, unlike the bare ledger read.
pub async fn get_map_with_countries(
    conn: &mut AsyncPgConnection,
    user_id: i32,
) -> Result<MapWithCountries, ServiceError> {
    let map = require_map(conn, user_id).await?;

    let rows: Vec<(MapCountry, Country)> = map_countries::table
        .inner_join(countries::table)
        .filter(map_countries::map_id.eq(map.id))
        .select((MapCountry::as_select(), Country::as_select()))
        .load(conn)
        .await?;

    Ok(MapWithCountries {
        map,
        visited_countries: rows.into_iter().map(VisitedCountry::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::world_percent;

    #[test]
    fn world_percent_is_zero_for_empty_catalog() {
        assert_eq!(world_percent(0, 0), 0.0);
        assert_eq!(world_percent(5, 0), 0.0);
    }

    #[test]
    fn world_percent_matches_expected_ratio() {
        let pct = world_percent(1, 195);
        assert!((pct - 0.5128).abs() < 1e-3);

        let pct = world_percent(2, 195);
        assert!((pct - 1.0256).abs() < 1e-3);
    }

    #[test]
    fn world_percent_stays_within_bounds() {
        for visited in 0..=195 {
            let pct = world_percent(visited, 195);
            assert!((0.0..=100.0).contains(&pct));
        }
        assert_eq!(world_percent(195, 195), 100.0);
    }
}
