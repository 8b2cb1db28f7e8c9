use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use utoipa::{IntoParams, OpenApi};

use crate::api::auth::Claims;
use crate::db::models::activity::{ActivityLogEntry, ActivityLogFilter};
use crate::db::models::client::{Client, STATUS_TAMMAM};
use crate::db::queries::activity as log_store;
use crate::db::queries::client as store;
use crate::middleware::auth::forbidden;
use crate::utils::api_response::ApiResponse;

#[derive(OpenApi)]
#[openapi(paths(export_clients, export_logs))]
pub struct ExportDoc;

pub fn export_routes() -> Router<PgPool> {
    Router::new()
        .route("/export/clients", get(export_clients))
        .route("/export/logs", get(export_logs))
}

#[derive(Deserialize, Debug, Default, IntoParams)]
pub struct ExportClientsParams {
    /// Export the trash partition instead of the active one.
    pub include_deleted: Option<bool>,
    /// Keep only clients whose status has been acted on.
    pub processed_only: Option<bool>,
    /// Keep only installment-completed (tammam) clients.
    pub completed_only: Option<bool>,
}

/// Quotes a single CSV field per RFC 4180: fields containing commas,
/// quotes or newlines are wrapped in quotes with inner quotes doubled.
fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

fn opt_str(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_date(value: &Option<NaiveDate>) -> String {
    value.map(|d| d.to_string()).unwrap_or_default()
}

fn opt_bool(value: &Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => String::new(),
    }
}

pub fn clients_to_csv(clients: &[Client]) -> String {
    let mut out = String::from(
        "id,name,phone,identity_number,status,upload_date,completion_date,\
         rejection_reason,pending_reason,acqara_approved,mawara_approved,\
         completed_service,incomplete_reason,installment_notes,\
         service_completion_date,added_by,processed_by\n",
    );
    for c in clients {
        out.push_str(&csv_row(&[
            c.id.to_string(),
            c.name.clone(),
            c.phone.clone(),
            opt_str(&c.identity_number),
            c.status.clone(),
            c.upload_date.to_string(),
            opt_date(&c.completion_date),
            opt_str(&c.rejection_reason),
            opt_str(&c.pending_reason),
            opt_bool(&c.acqara_approved),
            opt_bool(&c.mawara_approved),
            opt_bool(&c.completed_service),
            opt_str(&c.incomplete_reason),
            opt_str(&c.installment_notes),
            opt_date(&c.service_completion_date),
            c.added_by.clone(),
            opt_str(&c.processed_by),
        ]));
        out.push('\n');
    }
    out
}

pub fn logs_to_csv(entries: &[ActivityLogEntry]) -> String {
    let mut out =
        String::from("id,created_at,action_type,actor_name,details,affected_type,affected_id\n");
    for e in entries {
        out.push_str(&csv_row(&[
            e.id.to_string(),
            e.created_at.to_string(),
            e.action_type.clone(),
            e.actor_name.clone(),
            e.details.clone(),
            opt_str(&e.affected_type),
            opt_str(&e.affected_id),
        ]));
        out.push('\n');
    }
    out
}

fn csv_download(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// Snapshot of a client partition as a CSV download.
#[utoipa::path(
    get,
    path = "/export/clients",
    tag = "Export",
    params(ExportClientsParams),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 500, description = "Failed to retrieve clients")
    ),
    security(("bearerAuth" = []))
)]
pub async fn export_clients(
    State(pool): State<PgPool>,
    Extension(_claims): Extension<Claims>,
    Query(params): Query<ExportClientsParams>,
) -> Result<Response, ApiResponse<()>> {
    let deleted = params.include_deleted.unwrap_or(false);
    let mut clients = store::fetch_clients(&pool, deleted)
        .await
        .map_err(ApiResponse::store)?;

    if params.processed_only.unwrap_or(false) {
        clients.retain(|c| c.processed_by.is_some());
    }
    if params.completed_only.unwrap_or(false) {
        clients.retain(|c| c.status == STATUS_TAMMAM);
    }

    let filename = if deleted { "trash.csv" } else { "clients.csv" };
    Ok(csv_download(filename, clients_to_csv(&clients)))
}

/// Audit trail as a CSV download, honoring the same filters as the log
/// view but without pagination. Admin only, like the view itself.
#[utoipa::path(
    get,
    path = "/export/logs",
    tag = "Export",
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 500, description = "Failed to retrieve the activity log")
    ),
    security(("bearerAuth" = []))
)]
pub async fn export_logs(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<ActivityLogFilter>,
) -> Result<Response, ApiResponse<()>> {
    if !claims.is_admin() {
        return Err(forbidden("The activity log requires administrator privileges"));
    }

    // One buffered read rather than a streaming cursor. The trail is
    // bounded by day-to-day office volume.
    let entries = log_store::fetch_all_entries(&pool, &filter)
        .await
        .map_err(ApiResponse::store)?;

    Ok(csv_download("activity_log.csv", logs_to_csv(&entries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(csv_field("Ahmed"), "Ahmed");
        assert_eq!(csv_field(""), "");
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn rows_join_with_commas() {
        let row = csv_row(&["1".to_string(), "a,b".to_string(), "c".to_string()]);
        assert_eq!(row, "1,\"a,b\",c");
    }

    #[test]
    fn tri_state_flags_render_as_words() {
        assert_eq!(opt_bool(&Some(true)), "yes");
        assert_eq!(opt_bool(&Some(false)), "no");
        assert_eq!(opt_bool(&None), "");
    }

    #[test]
    fn client_export_has_a_header_and_one_line_per_client() {
        let csv = clients_to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("id,name,phone"));
    }
}
