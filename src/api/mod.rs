mod error;
mod handlers;

pub use error::ApiError;

use crate::config::Config;
use crate::db::Database;
use anyhow::Result;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Start the API server
pub async fn start_api_server(db: Arc<Database>) -> Result<()> {
    let config = Config::get();

    // Set up CORS
    let cors = if config.api.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::permissive()
    };

    // Create router with all routes
    let app = Router::new()
        // General routes
        .route("/health", get(handlers::health::health_check))
        // Map routes
        .route(
            "/maps/me",
            get(handlers::maps::get_my_map).post(handlers::maps::create_my_map),
        )
        .route(
            "/maps/me/countries",
            get(handlers::maps::get_my_visited_countries),
        )
        .route(
            "/maps/me/complete",
            get(handlers::maps::get_my_complete_map),
        )
        .route(
            "/maps/me/refresh",
            put(handlers::maps::refresh_my_map_metrics),
        )
        // Map-country curation routes
        .route(
            "/map-countries/me/countries/:country_id",
            post(handlers::map_countries::add_country_to_my_map)
                .delete(handlers::map_countries::remove_country_from_my_map),
        )
        // Trip routes
        .route(
            "/trips",
            get(handlers::trips::get_trips).post(handlers::trips::create_trip),
        )
        .route("/trips/me", get(handlers::trips::get_my_trips))
        .route(
            "/trips/:trip_id",
            get(handlers::trips::get_trip)
                .put(handlers::trips::update_trip)
                .delete(handlers::trips::delete_trip),
        )
        // Country catalog routes
        .route("/countries", get(handlers::countries::get_countries))
        .route("/countries/:country_id", get(handlers::countries::get_country))
        // Add state and middleware
        .with_state(db.get_pool().clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Get bind address
    let addr = format!("{}:{}", config.api.host, config.api.port).parse::<SocketAddr>()?;

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
