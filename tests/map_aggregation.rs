//! Aggregation flows exercised against a live PostgreSQL instance.
//!
//! The suite needs a database to talk to; every test is a no-op unless
//! `TEST_DATABASE_URL` points at one. Tests share the database, so each
//! seeds its own user and countries and they serialize on a lock to keep
//! the catalog count stable while percentages are asserted.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::{Connection, PgConnection};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use diesel_migrations::MigrationHarness;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use trip_atlas::db::MIGRATIONS;
use trip_atlas::models::map::Map;
use trip_atlas::models::map_country::MapCountry;
use trip_atlas::schema::{countries, map_countries, trips, users};
use trip_atlas::services::trip::{self, CreateTripRequest};
use trip_atlas::services::visits::{self, MapAggregator, VisitRecorder};
use trip_atlas::services::{country, map, ServiceError};

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

async fn connect() -> Option<AsyncPgConnection> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;

    let mut setup = PgConnection::establish(&url).expect("connect for migrations");
    setup
        .run_pending_migrations(MIGRATIONS)
        .expect("run migrations");

    let conn = AsyncPgConnection::establish(&url).await.expect("connect");
    Some(conn)
}

macro_rules! require_db {
    () => {
        match connect().await {
            Some(conn) => conn,
            None => {
                eprintln!("TEST_DATABASE_URL not set; skipping");
                return;
            }
        }
    };
}

fn unique_tag() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

async fn seed_user(conn: &mut AsyncPgConnection) -> i32 {
    let tag = unique_tag();
    diesel::insert_into(users::table)
        .values((
            users::username.eq(format!("wanderer_{}", tag)),
            users::email.eq(format!("wanderer_{}@example.com", tag)),
        ))
        .returning(users::id)
        .get_result(conn)
        .await
        .expect("seed user")
}

async fn seed_country(conn: &mut AsyncPgConnection, iso: &str) -> i32 {
    let tag = unique_tag();
    diesel::insert_into(countries::table)
        .values((
            countries::name.eq(format!("Testland {}", tag)),
            countries::iso_code.eq(iso),
        ))
        .returning(countries::id)
        .get_result(conn)
        .await
        .expect("seed country")
}

async fn ledger_rows(conn: &mut AsyncPgConnection, map_id: i32, country_id: i32) -> i64 {
    map_countries::table
        .filter(map_countries::map_id.eq(map_id))
        .filter(map_countries::country_id.eq(country_id))
        .count()
        .get_result(conn)
        .await
        .expect("count ledger rows")
}

fn trip_request(country_id: i32) -> CreateTripRequest {
    CreateTripRequest {
        name: "Round trip".to_string(),
        description: "Two weeks on the road".to_string(),
        start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 7, 14).unwrap(),
        country_id,
    }
}

#[tokio::test]
async fn revisit_increments_instead_of_duplicating() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;
    let country_id = seed_country(&mut conn, "TL").await;

    let first = visits::add_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("first visit");
    let second = visits::add_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("second visit");

    assert_eq!(second.id, first.id);
    assert_eq!(second.visit_count, 2);
    assert_eq!(second.first_visited, first.first_visited);
    assert!(second.last_visit >= first.last_visit);
    assert_eq!(ledger_rows(&mut conn, first.map_id, country_id).await, 1);

    // One country twice is still one distinct country
    let user_map = map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .expect("map exists");
    assert_eq!(user_map.countries_visited, 1);
}

#[tokio::test]
async fn removing_a_country_resets_its_visit_history() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;
    let country_id = seed_country(&mut conn, "TL").await;

    let entry = visits::add_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("first visit");
    visits::add_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("second visit");

    visits::remove_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("remove country");
    assert_eq!(ledger_rows(&mut conn, entry.map_id, country_id).await, 0);

    let cleared = map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .expect("map exists");
    assert_eq!(cleared.countries_visited, 0);

    let again = visits::add_country_for_user(&mut conn, &MapAggregator, user_id, country_id)
        .await
        .expect("visit after removal");
    assert_eq!(again.visit_count, 1);
    assert_eq!(again.first_visited, again.last_visit);
}

#[tokio::test]
async fn metrics_always_derive_from_the_ledger() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;
    let first_country = seed_country(&mut conn, "TA").await;
    let second_country = seed_country(&mut conn, "TB").await;

    visits::add_country_for_user(&mut conn, &MapAggregator, user_id, first_country)
        .await
        .expect("visit first country");
    visits::add_country_for_user(&mut conn, &MapAggregator, user_id, first_country)
        .await
        .expect("revisit first country");
    visits::add_country_for_user(&mut conn, &MapAggregator, user_id, second_country)
        .await
        .expect("visit second country");

    let user_map = map::update_map_metrics(&mut conn, user_id)
        .await
        .expect("refresh metrics");

    let distinct: i64 = map_countries::table
        .filter(map_countries::map_id.eq(user_map.id))
        .count()
        .get_result(&mut conn)
        .await
        .expect("count distinct countries");
    assert_eq!(user_map.countries_visited as i64, distinct);
    assert_eq!(user_map.countries_visited, 2);

    let total = country::count_all(&mut conn).await.expect("catalog count");
    let expected = user_map.countries_visited as f64 / total as f64 * 100.0;
    assert!((user_map.percent_world_visited - expected).abs() < 1e-9);
    assert!((0.0..=100.0).contains(&user_map.percent_world_visited));
}

#[tokio::test]
async fn trip_creation_rolls_back_when_the_country_is_unknown() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;

    let err = trip::create_trip(&mut conn, &MapAggregator, user_id, trip_request(-1))
        .await
        .expect_err("unknown country must fail");
    assert!(matches!(
        err,
        ServiceError::NotFound {
            code: "COUNTRY_NOT_FOUND",
            ..
        }
    ));

    let leftover: i64 = trips::table
        .filter(trips::user_id.eq(user_id))
        .count()
        .get_result(&mut conn)
        .await
        .expect("count trips");
    assert_eq!(leftover, 0);
    assert!(map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .is_none());
}

/// Recorder whose ledger writes always fail, to drive the rollback path
/// after the trip row has been inserted
struct UnavailableLedger;

#[async_trait]
impl VisitRecorder for UnavailableLedger {
    async fn record_visit(
        &self,
        _conn: &mut AsyncPgConnection,
        _user_id: i32,
        _country_id: i32,
    ) -> Result<MapCountry, ServiceError> {
        Err(ServiceError::internal("ledger unavailable"))
    }

    async fn record_removal(
        &self,
        _conn: &mut AsyncPgConnection,
        _user_id: i32,
        _country_id: i32,
    ) -> Result<(), ServiceError> {
        Err(ServiceError::internal("ledger unavailable"))
    }

    async fn refresh_metrics(
        &self,
        _conn: &mut AsyncPgConnection,
        _user_id: i32,
    ) -> Result<Map, ServiceError> {
        Err(ServiceError::internal("ledger unavailable"))
    }
}

#[tokio::test]
async fn trip_insert_rolls_back_when_the_visit_cannot_be_recorded() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;
    let country_id = seed_country(&mut conn, "TL").await;

    let err = trip::create_trip(&mut conn, &UnavailableLedger, user_id, trip_request(country_id))
        .await
        .expect_err("failed ledger write must fail the trip");
    assert!(matches!(err, ServiceError::Internal(_)));

    // The trip insert happened inside the same transaction and must be gone
    let leftover: i64 = trips::table
        .filter(trips::user_id.eq(user_id))
        .count()
        .get_result(&mut conn)
        .await
        .expect("count trips");
    assert_eq!(leftover, 0);
}

#[tokio::test]
async fn trips_drive_the_visited_map() {
    let _guard = DB_LOCK.lock().await;
    let mut conn = require_db!();
    let user_id = seed_user(&mut conn).await;
    let spain = seed_country(&mut conn, "ES").await;
    let france = seed_country(&mut conn, "FR").await;

    trip::create_trip(&mut conn, &MapAggregator, user_id, trip_request(spain))
        .await
        .expect("first trip");
    let user_map = map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .expect("map created with the first trip");
    assert_eq!(user_map.countries_visited, 1);

    trip::create_trip(&mut conn, &MapAggregator, user_id, trip_request(spain))
        .await
        .expect("second trip to the same country");
    let entry: MapCountry = map_countries::table
        .filter(map_countries::map_id.eq(user_map.id))
        .filter(map_countries::country_id.eq(spain))
        .first(&mut conn)
        .await
        .expect("ledger entry");
    assert_eq!(entry.visit_count, 2);
    let user_map = map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .expect("map exists");
    assert_eq!(user_map.countries_visited, 1);

    trip::create_trip(&mut conn, &MapAggregator, user_id, trip_request(france))
        .await
        .expect("trip to a new country");
    let user_map = map::get_map_by_user(&mut conn, user_id)
        .await
        .expect("lookup map")
        .expect("map exists");
    assert_eq!(user_map.countries_visited, 2);
}
