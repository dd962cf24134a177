use axum::{
    routing::{get, patch, post},
    Router,
};
use sqlx::PgPool;

use crate::db::queries::ticket::{
    create_ticket, create_ticket_reply, delete_ticket, get_ticket, get_ticket_replies,
    list_all_tickets, update_ticket,
};

/// Ticket routes for authenticated users (ownership enforced per handler).
pub fn ticket_routes() -> Router<PgPool> {
    Router::new()
        .route("/tickets", post(create_ticket))
        .route("/tickets/{ticket_id}", get(get_ticket).delete(delete_ticket))
        .route(
            "/tickets/{ticket_id}/replies",
            get(get_ticket_replies).post(create_ticket_reply),
        )
}

/// Admin-only ticket routes.
pub fn admin_ticket_routes() -> Router<PgPool> {
    Router::new()
        .route("/admin/tickets", get(list_all_tickets))
        .route("/admin/tickets/{ticket_id}", patch(update_ticket))
}
