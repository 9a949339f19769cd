pub mod country;
pub mod map;
pub mod map_country;
pub mod trip;
pub mod visits;

use thiserror::Error;

/// Domain-level error taxonomy. The API layer maps each variant to an HTTP
/// status and a structured `{code, message}` body.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    NotFound { code: &'static str, message: String },

    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    #[error("{message}")]
    Validation { code: String, message: String },

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn map_not_found() -> Self {
        Self::NotFound {
            code: "MAP_NOT_FOUND",
            message: "Map not found for the given user ID".to_string(),
        }
    }

    pub fn map_already_exists() -> Self {
        Self::Conflict {
            code: "MAP_ALREADY_EXISTS",
            message: "Map already exists for this user".to_string(),
        }
    }

    pub fn country_not_found(country_id: i32) -> Self {
        Self::NotFound {
            code: "COUNTRY_NOT_FOUND",
            message: format!("Country {} not found", country_id),
        }
    }

    pub fn map_country_not_found(country_id: i32) -> Self {
        Self::NotFound {
            code: "MAP_COUNTRY_NOT_FOUND",
            message: format!("Country {} is not on this map", country_id),
        }
    }

    pub fn trip_not_found(trip_id: i32) -> Self {
        Self::NotFound {
            code: "TRIP_NOT_FOUND",
            message: format!("Trip {} not found", trip_id),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
