use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Approval metadata attached to the ticket detail view: which admin
/// moved the ticket out of AWAITING_APPROVAL, and when. The underlying
/// record is written once per (ticket, admin) pair and read-only
/// afterward.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct ApprovalInfo {
    pub approved_by: i32,
    pub approver_name: String,
    pub approved_at: NaiveDateTime,
}
