//! Read-only views over the country catalog. The catalog is populated out
//! of band; the aggregation code only needs existence checks and the total
//! count for the world percentage.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::ServiceError;
use crate::models::country::Country;
use crate::schema::countries;

pub async fn country_exists(
    conn: &mut AsyncPgConnection,
    country_id: i32,
) -> Result<bool, ServiceError> {
    let count: i64 = countries::table
        .filter(countries::id.eq(country_id))
        .count()
        .get_result(conn)
        .await?;
    Ok(count > 0)
}

/// Total number of countries in the catalog
pub async fn count_all(conn: &mut AsyncPgConnection) -> Result<i64, ServiceError> {
    let total = countries::table.count().get_result(conn).await?;
    Ok(total)
}

pub async fn list_countries(conn: &mut AsyncPgConnection) -> Result<Vec<Country>, ServiceError> {
    let all = countries::table
        .order(countries::name.asc())
        .load::<Country>(conn)
        .await?;
    Ok(all)
}

pub async fn get_country_by_id(
    conn: &mut AsyncPgConnection,
    country_id: i32,
) -> Result<Country, ServiceError> {
    countries::table
        .find(country_id)
        .first::<Country>(conn)
        .await
        .optional()?
        .ok_or_else(|| ServiceError::country_not_found(country_id))
}
