use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// ✅ **Audit Entry Stored in PostgreSQL**
///
/// Append-only: entries are never updated or deleted. An undo writes a NEW
/// entry referencing the original rather than rewriting history.
#[derive(Serialize, Deserialize, Debug, Clone, FromRow, ToSchema)]
pub struct ActivityLogEntry {
    pub id: i32,
    pub action_type: String,
    pub actor_id: String,
    pub actor_name: String,
    pub details: String,
    pub affected_id: Option<String>,
    pub affected_type: Option<String>,
    /// Structured diff or contextual snapshot attached to the entry.
    #[schema(value_type = Object)]
    pub extra: Option<serde_json::Value>,
    /// Server-assigned, timezone-aware; undo eligibility compares this
    /// against the UTC clock, so both sides share a time basis.
    pub created_at: DateTime<Utc>,
}

/// Filter and paging parameters for the audit trail view.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ActivityLogFilter {
    pub actor: Option<String>,
    pub action_type: Option<String>,
    pub affected_type: Option<String>,
    /// Free text, matched across all string fields.
    pub search: Option<String>,
    /// Inclusive date range on `created_at`.
    pub from: Option<chrono::NaiveDate>,
    pub to: Option<chrono::NaiveDate>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// One page of audit entries plus the total row count for the filter.
#[derive(Serialize, ToSchema)]
pub struct ActivityLogPage {
    pub entries: Vec<ActivityLogEntry>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
