use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A threaded ticket message joined with the sender name for the thread
/// view. Append-only; replies are never edited or deleted.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct ReplyWithSender {
    pub id: i32,
    pub ticket_id: i32,
    pub sender_id: i32,
    pub sender_name: String,
    pub sender_role: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Deserialize, ToSchema)]
pub struct NewReply {
    pub message: String,
}
