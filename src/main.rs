use anyhow::Context;
use axum::middleware::from_fn;
use axum::Router;
use dotenvy::dotenv;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod config;
mod db;
mod middleware;
mod utils;

use crate::api::auth::AuthDoc;
use crate::api::google_oauth::GoogleOAuthDoc;
use crate::config::Config;
use crate::db::queries::dashboard::DashboardDoc;
use crate::db::queries::ticket::TicketDoc;
use crate::db::queries::user::UserDoc;
use crate::middleware::auth::{require_admin, session_middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    Config::init();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(true)
        .init();

    let pool = db::pool::get_db_pool()
        .await
        .context("Failed to connect to the database")?;

    let merged_doc = AuthDoc::openapi()
        .merge_from(GoogleOAuthDoc::openapi())
        .merge_from(TicketDoc::openapi())
        .merge_from(UserDoc::openapi())
        .merge_from(DashboardDoc::openapi());

    // Public routes: signup, login, OAuth, password reset
    let public_routes = Router::new()
        .merge(api::auth::auth_routes())
        .merge(api::google_oauth::g_auth_routes());

    // Session-gated routes
    let private_routes = Router::new()
        .merge(api::auth::secure_auth_routes())
        .merge(api::ticket::ticket_routes())
        .merge(api::user::user_routes())
        .merge(api::dashboard::dashboard_routes())
        .route_layer(from_fn(session_middleware));

    // Admin routes: session first, then the role gate
    let admin_routes = Router::new()
        .merge(api::ticket::admin_ticket_routes())
        .merge(api::user::admin_user_routes())
        .merge(api::dashboard::admin_dashboard_routes())
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn(session_middleware));

    let app = Router::new()
        .merge(api::health::health_routes())
        .merge(public_routes)
        .merge(private_routes)
        .merge(admin_routes)
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", merged_doc))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(pool.clone());

    let addr: SocketAddr = Config::get()
        .bind_addr
        .parse()
        .context("BIND_ADDR is not a valid socket address")?;

    tracing::info!("Server running at http://{addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .context("Failed to bind listener")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(pool))
        .await
        .context("Server encountered an error")?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(pool: PgPool) {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down...");
    pool.close().await;
    tracing::info!("Database pool closed");
}
