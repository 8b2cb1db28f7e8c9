use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Router,
};
use serde_json::json;
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::db::models::activity::{ActivityLogEntry, ActivityLogFilter, ActivityLogPage};
use crate::db::queries::activity as log_store;
use crate::db::queries::client as store;
use crate::middleware::auth::forbidden;
use crate::utils::activity_log::{
    ActivityEntryBuilder, ACTION_CLIENT_DELETED, ACTION_UNDO, AFFECTED_CLIENT,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::lifecycle::apply_field;
use crate::utils::undo::{self, UndoPlan};

#[derive(OpenApi)]
#[openapi(
    paths(get_activity_log, get_activity_entry, undo_activity_entry),
    components(schemas(ActivityLogEntry, ActivityLogFilter, ActivityLogPage))
)]
pub struct ActivityDoc;

pub fn activity_routes() -> Router<PgPool> {
    Router::new()
        .route("/activity", get(get_activity_log))
        .route("/activity/{id}", get(get_activity_entry))
        .route("/activity/{id}/undo", post(undo_activity_entry))
}

/// The audit trail is admin-facing tooling.
fn require_admin(claims: &Claims) -> Result<(), ApiResponse<()>> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(forbidden("The activity log requires administrator privileges"))
    }
}

/// Filtered, sorted, paginated view of the audit trail.
#[utoipa::path(
    get,
    path = "/activity",
    tag = "Activity",
    responses(
        (status = 200, description = "One page of audit entries", body = ActivityLogPage),
        (status = 403, description = "Caller is not an administrator"),
        (status = 500, description = "Failed to retrieve the activity log")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_activity_log(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Query(filter): Query<ActivityLogFilter>,
) -> Result<ApiResponse<ActivityLogPage>, ApiResponse<()>> {
    require_admin(&claims)?;

    let page = log_store::fetch_entries(&pool, &filter)
        .await
        .map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Activity log retrieved successfully",
        page,
    ))
}

#[utoipa::path(
    get,
    path = "/activity/{id}",
    tag = "Activity",
    params(("id" = i32, Path, description = "Audit entry ID")),
    responses(
        (status = 200, description = "Retrieve a single audit entry", body = ActivityLogEntry),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Entry not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_activity_entry(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<ActivityLogEntry>, ApiResponse<()>> {
    require_admin(&claims)?;

    let entry = log_store::fetch_entry(&pool, id)
        .await
        .map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Audit entry retrieved successfully",
        entry,
    ))
}

/// Best-effort reversal of a recorded action.
///
/// Eligible entries are recent edits with a recorded change list, recent
/// deletions, and recent status changes. The reversal runs through the
/// normal mutation path, so it produces a fresh audit entry referencing
/// the original; history is never rewritten.
#[utoipa::path(
    post,
    path = "/activity/{id}/undo",
    tag = "Activity",
    params(("id" = i32, Path, description = "Audit entry ID")),
    responses(
        (status = 200, description = "Operation reversed", body = crate::db::models::client::Client),
        (status = 400, description = "Entry is not undoable"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Entry or client no longer exists"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn undo_activity_entry(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<crate::db::models::client::Client>, ApiResponse<()>> {
    require_admin(&claims)?;

    let entry = log_store::fetch_entry(&pool, id)
        .await
        .map_err(ApiResponse::store)?;

    let config = Config::get();
    let now = chrono::Utc::now();
    if !undo::is_undoable(&entry, now, config.undo_window_hours) {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "This operation cannot be undone",
            None,
        ));
    }

    let plan = undo::plan(&entry).ok_or_else(|| {
        ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "This operation cannot be undone",
            None,
        )
    })?;

    let client_id: i32 = entry
        .affected_id
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| {
            ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "The entry does not reference a client",
                None,
            )
        })?;

    let reverted = match plan {
        UndoPlan::RevertFields(changes) => {
            let mut client = store::fetch_client(&pool, client_id)
                .await
                .map_err(ApiResponse::store)?;
            for change in &changes {
                apply_field(&mut client, &change.field, &change.old)
                    .map_err(ApiResponse::validation)?;
            }
            store::update_client(&pool, &client)
                .await
                .map_err(ApiResponse::store)?
        }
        UndoPlan::RestoreDeleted => store::restore_client(&pool, client_id)
            .await
            .map_err(ApiResponse::store)?,
    };

    let what = if entry.action_type == ACTION_CLIENT_DELETED {
        "deletion"
    } else {
        "edit"
    };
    ActivityEntryBuilder::new(ACTION_UNDO, &claims)
        .details(format!("reversed the {what} of client ({})", reverted.name))
        .affected(reverted.id, AFFECTED_CLIENT)
        .extra(json!({
            "original_entry_id": entry.id,
            "original_action_type": entry.action_type,
        }))
        .record(&pool)
        .await;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Operation reversed successfully",
        reverted,
    ))
}
