use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::maps;

/// Per-user aggregate of visited-country statistics. The counters are
/// derived from the map_countries ledger and rewritten on every refresh.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = maps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Map {
    pub id: i32,
    pub user_id: i32,
    pub countries_visited: i32,
    pub percent_world_visited: f64,
    pub map_image_url: Option<String>,
    pub last_updated: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = maps)]
pub struct NewMap {
    pub user_id: i32,
    pub countries_visited: i32,
    pub percent_world_visited: f64,
    pub last_updated: NaiveDateTime,
}

impl NewMap {
    /// A fresh map with zeroed counters
    pub fn for_user(user_id: i32) -> Self {
        Self {
            user_id,
            countries_visited: 0,
            percent_world_visited: 0.0,
            last_updated: Utc::now().naive_utc(),
        }
    }
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = maps)]
pub struct MapMetricsUpdate {
    pub countries_visited: i32,
    pub percent_world_visited: f64,
    pub last_updated: NaiveDateTime,
}
