//! Seam between trip lifecycle and the map aggregation subsystem. Trip
//! operations depend on the `VisitRecorder` trait rather than reaching into
//! the map modules directly.

use async_trait::async_trait;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncPgConnection;

use super::{map, map_country, ServiceError};
use crate::models::map::Map;
use crate::models::map_country::MapCountry;

#[async_trait]
pub trait VisitRecorder: Send + Sync {
    /// Record a visit to a country: get-or-create the user's map, then
    /// upsert the ledger row. Does not refresh the derived counters.
    async fn record_visit(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
        country_id: i32,
    ) -> Result<MapCountry, ServiceError>;

    /// Remove a country from the user's map. The map must exist.
    async fn record_removal(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
        country_id: i32,
    ) -> Result<(), ServiceError>;

    /// Recompute the map's derived counters from the ledger.
    async fn refresh_metrics(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
    ) -> Result<Map, ServiceError>;
}

/// Production recorder backed by the map and map_countries tables
pub struct MapAggregator;

#[async_trait]
impl VisitRecorder for MapAggregator {
    async fn record_visit(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
        country_id: i32,
    ) -> Result<MapCountry, ServiceError> {
        let user_map = match map::get_map_by_user(conn, user_id).await? {
            Some(existing) => existing,
            None => map::create_map_for_user(conn, user_id).await?,
        };
        map_country::add_country_to_map(conn, user_map.id, country_id).await
    }

    async fn record_removal(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
        country_id: i32,
    ) -> Result<(), ServiceError> {
        let user_map = map::get_map_by_user(conn, user_id)
            .await?
            .ok_or_else(ServiceError::map_not_found)?;
        map_country::remove_country_from_map(conn, user_map.id, country_id).await
    }

    async fn refresh_metrics(
        &self,
        conn: &mut AsyncPgConnection,
        user_id: i32,
    ) -> Result<Map, ServiceError> {
        map::update_map_metrics(conn, user_id).await
    }
}

/// Direct "add country to my map" curation: ledger upsert plus counter
/// refresh in one transaction.
pub async fn add_country_for_user(
    conn: &mut AsyncPgConnection,
    recorder: &dyn VisitRecorder,
    user_id: i32,
    country_id: i32,
) -> Result<MapCountry, ServiceError> {
    conn.build_transaction()
        .run(|conn| {
            async move {
                let entry = recorder.record_visit(conn, user_id, country_id).await?;
                recorder.refresh_metrics(conn, user_id).await?;
                Ok(entry)
            }
            .scope_boxed()
        })
        .await
}

/// Direct "remove country from my map" curation, also transactional
pub async fn remove_country_for_user(
    conn: &mut AsyncPgConnection,
    recorder: &dyn VisitRecorder,
    user_id: i32,
    country_id: i32,
) -> Result<(), ServiceError> {
    conn.build_transaction()
        .run(|conn| {
            async move {
                recorder.record_removal(conn, user_id, country_id).await?;
                recorder.refresh_metrics(conn, user_id).await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
}
