use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::user::{
    get_me, get_profile_image, list_users, update_user, upload_profile_image,
};

pub fn user_routes() -> Router<PgPool> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/{user_id}", put(update_user))
        .route(
            "/users/{user_id}/image",
            post(upload_profile_image).get(get_profile_image),
        )
}

pub fn admin_user_routes() -> Router<PgPool> {
    Router::new().route("/admin/users", get(list_users))
}
