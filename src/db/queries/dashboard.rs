use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

use crate::api::auth::Claims;
use crate::db::models::ticket::{TicketListParams, TicketPage};
use crate::db::queries::ticket::fetch_ticket_page;
use crate::utils::api_response::ApiResponse;

#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct StatusCountRow {
    pub status: String,
    pub count: i64,
}

#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct PriorityCountRow {
    pub priority: String,
    pub count: i64,
}

/// One (day, status) bucket of the rolling 7-day chart.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct DailyStatusRow {
    pub day: NaiveDate,
    pub status: String,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardReport {
    pub total_tickets: i64,
    pub total_users: i64,
    pub by_status: Vec<StatusCountRow>,
    pub by_priority: Vec<PriorityCountRow>,
    pub last_seven_days: Vec<DailyStatusRow>,
}

/// The requester's own tickets, paginated, with per-status subtotals.
#[utoipa::path(
    get,
    path = "/dashboard/tickets",
    tag = "Dashboard",
    params(TicketListParams),
    responses(
        (status = 200, description = "Dashboard tickets retrieved", body = TicketPage),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn user_dashboard(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<TicketListParams>,
) -> Result<ApiResponse<TicketPage>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let page = fetch_ticket_page(&pool, Some(user_id), &params)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to load dashboard", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Dashboard tickets retrieved",
        page,
    ))
}

/// Global aggregates for the admin dashboard. Recomputed per request;
/// no cache sits in front of these queries.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Report data retrieved", body = DashboardReport),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn admin_dashboard(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
) -> Result<ApiResponse<DashboardReport>, ApiResponse<()>> {
    let total_tickets: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to count tickets", e))?;

    let total_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to count users", e))?;

    let by_status = sqlx::query_as::<_, StatusCountRow>(
        "SELECT status, COUNT(*) AS count FROM tickets GROUP BY status ORDER BY status",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to group by status", e))?;

    let by_priority = sqlx::query_as::<_, PriorityCountRow>(
        "SELECT priority, COUNT(*) AS count FROM tickets GROUP BY priority ORDER BY priority",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to group by priority", e))?;

    let last_seven_days = sqlx::query_as::<_, DailyStatusRow>(
        "SELECT created_at::date AS day, status, COUNT(*) AS count \
         FROM tickets WHERE created_at >= NOW() - INTERVAL '7 days' \
         GROUP BY day, status ORDER BY day, status",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to build weekly counts", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Report data retrieved",
        DashboardReport {
            total_tickets,
            total_users,
            by_status,
            by_priority,
            last_seven_days,
        },
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(user_dashboard, admin_dashboard),
    components(
        schemas(DashboardReport, StatusCountRow, PriorityCountRow, DailyStatusRow)
    ),
    tags(
        (name = "Dashboard", description = "Dashboard & Reporting Endpoints")
    )
)]
pub struct DashboardDoc;
