use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::{connection, UserQuery};
use crate::api::error::ApiError;
use crate::db::DbPool;
use crate::models::trip::Trip;
use crate::services::trip::{self, CreateTripRequest, TripFilter, UpdateTripRequest};
use crate::services::visits::MapAggregator;

/// List trips with optional date-range filter and pagination
pub async fn get_trips(
    State(db_pool): State<DbPool>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<Vec<Trip>>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let all = trip::list_trips(&mut conn, &filter).await?;
    Ok(Json(all))
}

/// List the current user's trips
pub async fn get_my_trips(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Trip>>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let all = trip::list_trips_by_user(&mut conn, query.user_id).await?;
    Ok(Json(all))
}

pub async fn get_trip(
    State(db_pool): State<DbPool>,
    Path(trip_id): Path<i32>,
) -> Result<Json<Trip>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let found = trip::get_trip_by_id(&mut conn, trip_id).await?;
    Ok(Json(found))
}

/// Create a trip; records the visit on the user's map in the same
/// transaction
pub async fn create_trip(
    State(db_pool): State<DbPool>,
    Query(query): Query<UserQuery>,
    Json(payload): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let mut conn = connection(&db_pool).await?;
    let created = trip::create_trip(&mut conn, &MapAggregator, query.user_id, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_trip(
    State(db_pool): State<DbPool>,
    Path(trip_id): Path<i32>,
    Query(query): Query<UserQuery>,
    Json(payload): Json<UpdateTripRequest>,
) -> Result<Json<Trip>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let updated =
        trip::update_trip(&mut conn, &MapAggregator, query.user_id, trip_id, payload).await?;
    Ok(Json(updated))
}

pub async fn delete_trip(
    State(db_pool): State<DbPool>,
    Path(trip_id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<StatusCode, ApiError> {
    let mut conn = connection(&db_pool).await?;
    trip::delete_trip(&mut conn, &MapAggregator, query.user_id, trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
