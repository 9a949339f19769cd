use axum::{
    extract::{Path, State},
    Json,
};

use super::connection;
use crate::api::error::ApiError;
use crate::db::DbPool;
use crate::models::country::Country;
use crate::services::country;

/// List the country catalog; empty catalog returns an empty list
pub async fn get_countries(
    State(db_pool): State<DbPool>,
) -> Result<Json<Vec<Country>>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let all = country::list_countries(&mut conn).await?;
    Ok(Json(all))
}

pub async fn get_country(
    State(db_pool): State<DbPool>,
    Path(country_id): Path<i32>,
) -> Result<Json<Country>, ApiError> {
    let mut conn = connection(&db_pool).await?;
    let found = country::get_country_by_id(&mut conn, country_id).await?;
    Ok(Json(found))
}
