use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use garagebook::config::AppConfig;
use garagebook::db;
use garagebook::handlers;
use garagebook::services::settings::DbSettings;
use garagebook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let db = Arc::new(Mutex::new(conn));

    let state = Arc::new(AppState {
        db: Arc::clone(&db),
        config: config.clone(),
        settings: Box::new(DbSettings::new(db)),
    });

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/public/appointments/availability",
            get(handlers::public::get_availability),
        )
        .route(
            "/public/appointments",
            post(handlers::public::create_appointment),
        )
        .route(
            "/api/admin/appointments",
            get(handlers::admin::get_appointments),
        )
        .route(
            "/api/admin/appointments/:id/confirm",
            post(handlers::admin::confirm_appointment),
        )
        .route(
            "/api/admin/appointments/:id/cancel",
            post(handlers::admin::cancel_appointment),
        )
        .route("/api/admin/settings", get(handlers::admin::get_settings))
        .route(
            "/api/admin/settings",
            post(handlers::admin::update_settings),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
