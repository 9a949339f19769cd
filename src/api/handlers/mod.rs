pub mod countries;
pub mod health;
pub mod map_countries;
pub mod maps;
pub mod trips;

use serde::Deserialize;

use crate::api::error::ApiError;
use crate::db::{DbConnection, DbPool};

/// The authenticated user id, forwarded by the gateway as a query parameter
#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

/// Checkout a pooled connection, mapping pool failures to a 500
pub async fn connection(pool: &DbPool) -> Result<DbConnection, ApiError> {
    pool.get()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to get database connection: {}", e)))
}
