use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::{connection, UserQuery};
use crate::api::error::ApiError;
use crate::db::DbPool;
use crate::models::map::Map;
use crate::models::map_country::VisitedCountry;
use crate::services::map::MapWithCountries;
use crate::services::{map, map_country, ServiceError};

/// Get the current user's map snapshot
pub async fn get_my_map(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Map>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let user_map = map::get_map_by_user(&mut conn, query.user_id)
        .await?
        .ok_or_else(ServiceError::map_not_found)?;
    Ok(Json(user_map))
}

/// Create a map for the current user; 409 if one already exists
pub async fn create_my_map(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<(StatusCode, Json<Map>), ApiError> {
    let mut conn = connection(&db_pool).await?;
    let user_map = map::create_map_for_user(&mut conn, query.user_id).await?;
    Ok((StatusCode::CREATED, Json(user_map)))
}

/// List the current user's visited countries with country detail
pub async fn get_my_visited_countries(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<VisitedCountry>>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let user_map = map::get_map_by_user(&mut conn, query.user_id)
        .await?
        .ok_or_else(ServiceError::map_not_found)?;
    let visited = map_country::get_countries_by_map(&mut conn, user_map.id).await?;
    Ok(Json(visited))
}

/// Get the map together with its enriched visited-country list
pub async fn get_my_complete_map(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<Json<MapWithCountries>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let complete = map::get_map_with_countries(&mut conn, query.user_id).await?;
    Ok(Json(complete))
}

/// Force a recomputation of the derived counters
pub async fn refresh_my_map_metrics(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Map>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let user_map = map::update_map_metrics(&mut conn, query.user_id).await?;
    Ok(Json(user_map))
}
