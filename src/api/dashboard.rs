use axum::{routing::get, Router};
use sqlx::PgPool;

use crate::db::queries::dashboard::{admin_dashboard, user_dashboard};

pub fn dashboard_routes() -> Router<PgPool> {
    Router::new().route("/dashboard/tickets", get(user_dashboard))
}

pub fn admin_dashboard_routes() -> Router<PgPool> {
    Router::new().route("/admin/dashboard", get(admin_dashboard))
}
