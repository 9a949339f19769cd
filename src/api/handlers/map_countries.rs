use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{connection, UserQuery};
use crate::api::error::ApiError;
use crate::db::DbPool;
use crate::models::map_country::MapCountry;
use crate::services::visits::{self, MapAggregator};

/// Add a country to the current user's map, creating the map on first use
pub async fn add_country_to_my_map(
    State(db_pool): State<DbPool>,
    Path(country_id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<(StatusCode, Json<MapCountry>), ApiError> {
    let mut conn = connection(&db_pool).await?;
    let entry =
        visits::add_country_for_user(&mut conn, &MapAggregator, query.user_id, country_id).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Remove a country from the current user's map; 404 if the map or the
/// pair does not exist
pub async fn remove_country_from_my_map(
    State(db_pool): State<DbPool>,
    Path(country_id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let mut conn = connection(&db_pool).await?;
    visits::remove_country_for_user(&mut conn, &MapAggregator, query.user_id, country_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
