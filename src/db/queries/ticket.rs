use axum::{
    extract::{Extension, Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::api::auth::Claims;
use crate::db::models::approval::ApprovalInfo;
use crate::db::models::reply::{NewReply, ReplyWithSender};
use crate::db::models::ticket::{
    NewTicket, SortDir, StatusCounts, Ticket, TicketDetail, TicketListParams, TicketPage,
    TicketStatus, TicketWithOwner, UpdateTicket,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::pagination::Pagination;
use crate::utils::policy::can_access;

/// Shared listing query behind both the user dashboard and the admin
/// ticket table. `owner` scopes every count and row to one user; `None`
/// is the admin's global view.
pub async fn fetch_ticket_page(
    pool: &PgPool,
    owner: Option<i32>,
    params: &TicketListParams,
) -> Result<TicketPage, sqlx::Error> {
    let pg = Pagination::clamp(params.page, params.limit);
    let sort = params.sort.unwrap_or(SortDir::Desc);

    let mut rows = QueryBuilder::<Postgres>::new(
        "SELECT id, user_id, subject, description, priority, status, created_at, updated_at \
         FROM tickets WHERE 1=1",
    );
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tickets WHERE 1=1");

    for qb in [&mut rows, &mut count] {
        if let Some(owner_id) = owner {
            qb.push(" AND user_id = ").push_bind(owner_id);
        }
        if let Some(status) = params.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = params.priority {
            qb.push(" AND priority = ").push_bind(priority.as_str());
        }
    }

    rows.push(" ORDER BY created_at ")
        .push(sort.as_sql())
        .push(" LIMIT ")
        .push_bind(pg.limit)
        .push(" OFFSET ")
        .push_bind(pg.offset());

    let tickets = rows
        .build_query_as::<Ticket>()
        .fetch_all(pool)
        .await?;
    let total_count: i64 = count.build_query_scalar().fetch_one(pool).await?;

    // Subtotals ignore the status/priority filter but keep the owner
    // scope, so the dashboard tiles always show the full picture.
    let mut counts = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(*) FILTER (WHERE status = 'AWAITING_APPROVAL') AS awaiting_approval, \
         COUNT(*) FILTER (WHERE status = 'PROCESSING') AS processing, \
         COUNT(*) FILTER (WHERE status = 'RESOLVED') AS resolved \
         FROM tickets",
    );
    if let Some(owner_id) = owner {
        counts.push(" WHERE user_id = ").push_bind(owner_id);
    }
    let status_counts = counts
        .build_query_as::<StatusCounts>()
        .fetch_one(pool)
        .await?;

    Ok(TicketPage {
        tickets,
        total_count,
        total_pages: pg.total_pages(total_count),
        page: pg.page,
        limit: pg.limit,
        status_counts,
    })
}

/// Submit a new support ticket. Status always starts at
/// AWAITING_APPROVAL; only the priority is caller-chosen.
#[utoipa::path(
    post,
    path = "/tickets",
    tag = "Tickets",
    request_body = NewTicket,
    responses(
        (status = 201, description = "Ticket created", body = i32),
        (status = 400, description = "Missing required fields"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<NewTicket>,
) -> Result<ApiResponse<i32>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    if payload.subject.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Subject and description are required",
            None,
        ));
    }

    let ticket_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO tickets (user_id, subject, description, priority, status) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(user_id)
    .bind(payload.subject.trim())
    .bind(payload.description.trim())
    .bind(payload.priority.as_str())
    .bind(TicketStatus::AwaitingApproval.as_str())
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to create ticket", e))?;

    info!(user = user_id, ticket = ticket_id, "ticket created");
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Ticket created successfully",
        ticket_id,
    ))
}

/// Ticket detail with owner info, plus approval metadata once the
/// ticket has left AWAITING_APPROVAL. Owner or admin only.
#[utoipa::path(
    get,
    path = "/tickets/{ticket_id}",
    tag = "Tickets",
    params(
        ("ticket_id" = i32, Path, description = "ID of the ticket to retrieve"),
    ),
    responses(
        (status = 200, description = "Ticket retrieved successfully", body = TicketDetail),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(ticket_id): AxumPath<i32>,
) -> Result<ApiResponse<TicketDetail>, ApiResponse<()>> {
    let ticket = sqlx::query_as::<_, TicketWithOwner>(
        "SELECT t.id, t.user_id, t.subject, t.description, t.priority, t.status, \
                t.created_at, t.updated_at, u.name AS owner_name, u.email AS owner_email \
         FROM tickets t JOIN users u ON u.id = t.user_id \
         WHERE t.id = $1",
    )
    .bind(ticket_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Database query failed", e))?
    .ok_or_else(|| ApiResponse::not_found("Ticket not found"))?;

    if !can_access(&claims, ticket.user_id) {
        return Err(ApiResponse::forbidden(
            "You do not have access to this ticket",
        ));
    }

    let approval = if ticket.status != TicketStatus::AwaitingApproval.as_str() {
        sqlx::query_as::<_, ApprovalInfo>(
            "SELECT a.approved_by, u.name AS approver_name, a.created_at AS approved_at \
             FROM ticket_approvals a JOIN users u ON u.id = a.approved_by \
             WHERE a.ticket_id = $1 ORDER BY a.created_at LIMIT 1",
        )
        .bind(ticket_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?
    } else {
        None
    };

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Ticket retrieved successfully",
        TicketDetail { ticket, approval },
    ))
}

/// Admin triage: set status and/or priority. Transitions are not
/// constrained; leaving AWAITING_APPROVAL records who approved.
#[utoipa::path(
    patch,
    path = "/admin/tickets/{ticket_id}",
    tag = "Tickets",
    params(
        ("ticket_id" = i32, Path, description = "ID of the ticket to update"),
    ),
    request_body = UpdateTicket,
    responses(
        (status = 200, description = "Ticket updated successfully"),
        (status = 400, description = "No fields provided for update"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(ticket_id): AxumPath<i32>,
    Json(payload): Json<UpdateTicket>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if payload.status.is_none() && payload.priority.is_none() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "No fields provided for update",
            None,
        ));
    }

    let previous: Option<String> =
        sqlx::query_scalar("SELECT status FROM tickets WHERE id = $1")
            .bind(ticket_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(previous) = previous else {
        return Err(ApiResponse::not_found("Ticket not found"));
    };

    sqlx::query(
        "UPDATE tickets SET status = COALESCE($1, status), \
         priority = COALESCE($2, priority), updated_at = NOW() WHERE id = $3",
    )
    .bind(payload.status.map(|s| s.as_str()))
    .bind(payload.priority.map(|p| p.as_str()))
    .bind(ticket_id)
    .execute(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to update ticket", e))?;

    // First transition out of AWAITING_APPROVAL writes the approval
    // record. Idempotent on the (ticket, admin) unique pair.
    if let Some(new_status) = payload.status {
        if previous == TicketStatus::AwaitingApproval.as_str()
            && new_status != TicketStatus::AwaitingApproval
        {
            let admin_id = claims.user_id()?;
            sqlx::query(
                "INSERT INTO ticket_approvals (ticket_id, approved_by) VALUES ($1, $2) \
                 ON CONFLICT (ticket_id, approved_by) DO NOTHING",
            )
            .bind(ticket_id)
            .bind(admin_id)
            .execute(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to record approval", e))?;

            info!(ticket = ticket_id, admin = admin_id, "ticket approved");
        }
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Ticket updated successfully",
        (),
    ))
}

/// Hard delete by the owner or an admin. Replies and approvals go with
/// the ticket via ON DELETE CASCADE.
#[utoipa::path(
    delete,
    path = "/tickets/{ticket_id}",
    tag = "Tickets",
    params(
        ("ticket_id" = i32, Path, description = "ID of the ticket to delete"),
    ),
    responses(
        (status = 200, description = "Ticket deleted successfully"),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_ticket(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(ticket_id): AxumPath<i32>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let owner_id: Option<i32> = sqlx::query_scalar("SELECT user_id FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(owner_id) = owner_id else {
        return Err(ApiResponse::not_found("Ticket not found"));
    };

    if !can_access(&claims, owner_id) {
        return Err(ApiResponse::forbidden(
            "You do not have access to this ticket",
        ));
    }

    let deleted: Option<i32> =
        sqlx::query_scalar("DELETE FROM tickets WHERE id = $1 RETURNING id")
            .bind(ticket_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Failed to delete ticket", e))?;

    if deleted.is_none() {
        return Err(ApiResponse::not_found("Ticket not found"));
    }

    info!(ticket = ticket_id, user = %claims.sub, "ticket deleted");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Ticket deleted successfully",
        (),
    ))
}

/// Admin-wide paginated ticket listing with filters and global
/// per-status subtotals.
#[utoipa::path(
    get,
    path = "/admin/tickets",
    tag = "Tickets",
    params(TicketListParams),
    responses(
        (status = 200, description = "Tickets retrieved successfully", body = TicketPage),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_all_tickets(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
    Query(params): Query<TicketListParams>,
) -> Result<ApiResponse<TicketPage>, ApiResponse<()>> {
    let page = fetch_ticket_page(&pool, None, &params)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to list tickets", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Tickets retrieved successfully",
        page,
    ))
}

/// Thread of replies in creation order. Owner or admin only.
#[utoipa::path(
    get,
    path = "/tickets/{ticket_id}/replies",
    tag = "Tickets",
    params(
        ("ticket_id" = i32, Path, description = "ID of the ticket"),
    ),
    responses(
        (status = 200, description = "Replies retrieved successfully", body = Vec<ReplyWithSender>),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_ticket_replies(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(ticket_id): AxumPath<i32>,
) -> Result<ApiResponse<Vec<ReplyWithSender>>, ApiResponse<()>> {
    let owner_id: Option<i32> = sqlx::query_scalar("SELECT user_id FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(owner_id) = owner_id else {
        return Err(ApiResponse::not_found("Ticket not found"));
    };

    if !can_access(&claims, owner_id) {
        return Err(ApiResponse::forbidden(
            "You do not have access to this ticket",
        ));
    }

    let replies = sqlx::query_as::<_, ReplyWithSender>(
        "SELECT r.id, r.ticket_id, r.sender_id, u.name AS sender_name, r.sender_role, \
                r.message, r.created_at \
         FROM ticket_replies r JOIN users u ON u.id = r.sender_id \
         WHERE r.ticket_id = $1 ORDER BY r.created_at ASC, r.id ASC",
    )
    .bind(ticket_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to load replies", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Replies retrieved successfully",
        replies,
    ))
}

/// Append a reply tagged with the sender's role. Owner or admin only;
/// replies are immutable once stored.
#[utoipa::path(
    post,
    path = "/tickets/{ticket_id}/replies",
    tag = "Tickets",
    params(
        ("ticket_id" = i32, Path, description = "ID of the ticket"),
    ),
    request_body = NewReply,
    responses(
        (status = 201, description = "Reply posted", body = i32),
        (status = 400, description = "Empty message"),
        (status = 403, description = "Not the owner or an admin"),
        (status = 404, description = "Ticket not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_ticket_reply(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    AxumPath(ticket_id): AxumPath<i32>,
    Json(payload): Json<NewReply>,
) -> Result<ApiResponse<i32>, ApiResponse<()>> {
    if payload.message.trim().is_empty() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Reply message is required",
            None,
        ));
    }

    let owner_id: Option<i32> = sqlx::query_scalar("SELECT user_id FROM tickets WHERE id = $1")
        .bind(ticket_id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(owner_id) = owner_id else {
        return Err(ApiResponse::not_found("Ticket not found"));
    };

    if !can_access(&claims, owner_id) {
        return Err(ApiResponse::forbidden(
            "You do not have access to this ticket",
        ));
    }

    let sender_id = claims.user_id()?;
    let reply_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO ticket_replies (ticket_id, sender_id, sender_role, message) \
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(ticket_id)
    .bind(sender_id)
    .bind(&claims.role)
    .bind(payload.message.trim())
    .fetch_one(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to post reply", e))?;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Reply posted successfully",
        reply_id,
    ))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        create_ticket,
        get_ticket,
        update_ticket,
        delete_ticket,
        list_all_tickets,
        get_ticket_replies,
        create_ticket_reply
    ),
    components(
        schemas(NewTicket, UpdateTicket, TicketDetail, TicketPage, ReplyWithSender, NewReply)
    ),
    tags(
        (name = "Tickets", description = "Ticket Lifecycle Endpoints")
    )
)]
pub struct TicketDoc;
