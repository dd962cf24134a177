use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// What the API returns for a user: everything except the credential
/// columns (password hash, reset token); those are read through narrow
/// per-handler row types and never serialize.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub image: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub google_linked: bool,
    pub created_at: NaiveDateTime,
}

/// Partial profile update. A password change on the self path must carry
/// the current password.
#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
}
