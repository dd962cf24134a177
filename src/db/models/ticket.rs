use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::db::models::approval::ApprovalInfo;

/// Ticket lifecycle states. There is deliberately no transition table:
/// any state may follow any other, matching the triage workflow where an
/// admin can reopen or re-flag a ticket at will.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    AwaitingApproval,
    Pending,
    Rejected,
    Processing,
    Resolved,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::AwaitingApproval => "AWAITING_APPROVAL",
            TicketStatus::Pending => "PENDING",
            TicketStatus::Rejected => "REJECTED",
            TicketStatus::Processing => "PROCESSING",
            TicketStatus::Resolved => "RESOLVED",
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING_APPROVAL" => Ok(TicketStatus::AwaitingApproval),
            "PENDING" => Ok(TicketStatus::Pending),
            "REJECTED" => Ok(TicketStatus::Rejected),
            "PROCESSING" => Ok(TicketStatus::Processing),
            "RESOLVED" => Ok(TicketStatus::Resolved),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Low => "LOW",
            TicketPriority::Medium => "MEDIUM",
            TicketPriority::High => "HIGH",
        }
    }
}

/// Sort direction for listing endpoints, newest-first by default.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }
}

/// Ticket row as stored. Status and priority are kept as text in the
/// database; the API boundary only admits the enum values above.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct Ticket {
    pub id: i32,
    pub user_id: i32,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Deserialize, ToSchema)]
pub struct NewTicket {
    pub subject: String,
    pub description: String,
    pub priority: TicketPriority,
}

/// Admin triage update; at least one field must be present.
#[derive(Deserialize, ToSchema)]
pub struct UpdateTicket {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

/// Ticket joined with its owner for the detail view.
#[derive(Serialize, Deserialize, Debug, FromRow, ToSchema)]
pub struct TicketWithOwner {
    pub id: i32,
    pub user_id: i32,
    pub subject: String,
    pub description: String,
    pub priority: String,
    pub status: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub owner_name: String,
    pub owner_email: String,
}

#[derive(Serialize, ToSchema)]
pub struct TicketDetail {
    #[serde(flatten)]
    pub ticket: TicketWithOwner,
    /// Present once the ticket has left AWAITING_APPROVAL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval: Option<ApprovalInfo>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub sort: Option<SortDir>,
}

/// Per-status subtotals returned alongside every ticket listing, scoped
/// the same way the listing itself is.
#[derive(Serialize, Deserialize, Debug, Default, FromRow, ToSchema)]
pub struct StatusCounts {
    pub awaiting_approval: i64,
    pub processing: i64,
    pub resolved: i64,
}

#[derive(Serialize, ToSchema)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub limit: i64,
    pub status_counts: StatusCounts,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            TicketStatus::AwaitingApproval,
            TicketStatus::Pending,
            TicketStatus::Rejected,
            TicketStatus::Processing,
            TicketStatus::Resolved,
        ] {
            assert_eq!(TicketStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(TicketStatus::from_str("CLOSED").is_err());
        assert!(serde_json::from_str::<TicketStatus>("\"closed\"").is_err());
    }

    #[test]
    fn wire_format_is_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TicketStatus::AwaitingApproval).unwrap(),
            "\"AWAITING_APPROVAL\""
        );
        assert_eq!(
            serde_json::from_str::<TicketPriority>("\"HIGH\"").unwrap(),
            TicketPriority::High
        );
    }
}
