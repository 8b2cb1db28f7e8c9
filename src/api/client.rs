use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use utoipa::{OpenApi, ToSchema};

use crate::api::auth::Claims;
use crate::db::models::client::{Client, ClientPayload, STATUS_TAMMAM};
use crate::db::queries::client as store;
use crate::utils::activity_log::{
    ActivityEntryBuilder, ACTION_CLIENT_ADDED, ACTION_CLIENT_DELETED, ACTION_CLIENT_EDITED,
    ACTION_CLIENT_PURGED, ACTION_CLIENT_RESTORED, ACTION_NOTES_UPDATED, ACTION_STATUS_CHANGED,
    AFFECTED_CLIENT,
};
use crate::utils::api_response::ApiResponse;
use crate::utils::lifecycle::{diff, validate_payload, FieldChange};

#[derive(OpenApi)]
#[openapi(
    paths(
        add_client,
        update_client,
        get_clients,
        get_trashed_clients,
        get_client,
        search_clients,
        delete_client,
        restore_client,
        permanently_delete_client,
    ),
    components(schemas(Client, ClientPayload, SearchParams))
)]
pub struct ClientDoc;

pub fn client_routes() -> Router<PgPool> {
    Router::new()
        .route("/clients", post(add_client).get(get_clients))
        .route("/clients/trash", get(get_trashed_clients))
        .route("/clients/search", get(search_clients))
        .route(
            "/clients/{id}",
            get(get_client).put(update_client).delete(delete_client),
        )
        .route("/clients/{id}/restore", post(restore_client))
        .route("/clients/{id}/permanent", delete(permanently_delete_client))
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Picks the audit tag for an update from the shape of its change list.
/// A lone status flip is a status change; touching only the installment
/// notes of a tammam client is a notes update; anything else is an edit.
fn update_action(changes: &[FieldChange], new_status: &str) -> &'static str {
    match changes {
        [only] if only.field == "status" => ACTION_STATUS_CHANGED,
        [only] if only.field == "installment_notes" && new_status == STATUS_TAMMAM => {
            ACTION_NOTES_UPDATED
        }
        _ => ACTION_CLIENT_EDITED,
    }
}

fn update_extra(
    changes: &[FieldChange],
    action: &str,
    old: &Client,
    new: &Client,
) -> serde_json::Value {
    match action {
        ACTION_NOTES_UPDATED => json!({
            "status": new.status,
            "previous_notes": old.installment_notes.clone().unwrap_or_default(),
            "new_notes": new.installment_notes.clone().unwrap_or_default(),
            "changes": changes,
        }),
        ACTION_STATUS_CHANGED => json!({
            "previous_status": old.status,
            "new_status": new.status,
            "changes": changes,
        }),
        _ => json!({
            "previous_status": old.status,
            "changes": changes,
        }),
    }
}

/// Registers a new client record.
#[utoipa::path(
    post,
    path = "/clients",
    tag = "Clients",
    request_body = ClientPayload,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 400, description = "Validation failed"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn add_client(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(mut payload): Json<ClientPayload>,
) -> Result<ApiResponse<Client>, ApiResponse<()>> {
    validate_payload(&mut payload).map_err(ApiResponse::validation)?;

    let client = store::insert_client(&pool, &payload, &claims.username, today())
        .await
        .map_err(ApiResponse::store)?;

    ActivityEntryBuilder::new(ACTION_CLIENT_ADDED, &claims)
        .details(format!("added new client ({})", client.name))
        .affected(client.id, AFFECTED_CLIENT)
        .extra(json!({ "status": client.status }))
        .record(&pool)
        .await;

    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Client added successfully",
        client,
    ))
}

/// Updates an existing client and records the field-level diff.
#[utoipa::path(
    put,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client ID")),
    request_body = ClientPayload,
    responses(
        (status = 200, description = "Client updated", body = Client),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Client not found"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_client(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(mut payload): Json<ClientPayload>,
) -> Result<ApiResponse<Client>, ApiResponse<()>> {
    validate_payload(&mut payload).map_err(ApiResponse::validation)?;

    // Load the current version first; the diff is computed against it.
    let old = store::fetch_client(&pool, id).await.map_err(ApiResponse::store)?;
    let new = old.with_payload(&payload, &claims.username);

    let updated = store::update_client(&pool, &new)
        .await
        .map_err(ApiResponse::store)?;

    let changes = diff(&old, &updated);
    let described: Vec<String> = changes.iter().map(FieldChange::describe).collect();
    let action = update_action(&changes, &updated.status);

    let mut builder = ActivityEntryBuilder::new(action, &claims)
        .details(if described.is_empty() {
            format!("edited client ({})", updated.name)
        } else {
            format!("edited client ({}): {}", updated.name, described.join(" | "))
        })
        .affected(updated.id, AFFECTED_CLIENT);
    if !changes.is_empty() {
        builder = builder.extra(update_extra(&changes, action, &old, &updated));
    }
    builder.record(&pool).await;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Client updated successfully",
        updated,
    ))
}

/// Lists the active partition, newest first.
#[utoipa::path(
    get,
    path = "/clients",
    tag = "Clients",
    responses(
        (status = 200, description = "List all active clients", body = [Client]),
        (status = 500, description = "Failed to retrieve clients")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_clients(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Client>>, ApiResponse<()>> {
    let clients = store::fetch_clients(&pool, false)
        .await
        .map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Clients retrieved successfully",
        clients,
    ))
}

/// Lists the trashed partition.
#[utoipa::path(
    get,
    path = "/clients/trash",
    tag = "Clients",
    responses(
        (status = 200, description = "List all trashed clients", body = [Client]),
        (status = 500, description = "Failed to retrieve clients")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_trashed_clients(
    State(pool): State<PgPool>,
) -> Result<ApiResponse<Vec<Client>>, ApiResponse<()>> {
    let clients = store::fetch_clients(&pool, true)
        .await
        .map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Trashed clients retrieved successfully",
        clients,
    ))
}

#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Retrieve a single client", body = Client),
        (status = 404, description = "Client not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_client(
    State(pool): State<PgPool>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Client>, ApiResponse<()>> {
    let client = store::fetch_client(&pool, id).await.map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Client retrieved successfully",
        client,
    ))
}

#[derive(Deserialize, ToSchema)]
pub struct SearchParams {
    /// Substring matched against name, phone and identity number.
    #[serde(default)]
    pub q: String,
}

/// Case-insensitive substring search. A blank term returns an empty list.
#[utoipa::path(
    get,
    path = "/clients/search",
    tag = "Clients",
    params(("q" = String, Query, description = "Search term")),
    responses(
        (status = 200, description = "Matching active clients", body = [Client]),
        (status = 500, description = "Failed to search clients")
    ),
    security(("bearerAuth" = []))
)]
pub async fn search_clients(
    State(pool): State<PgPool>,
    Query(params): Query<SearchParams>,
) -> Result<ApiResponse<Vec<Client>>, ApiResponse<()>> {
    let clients = store::search_clients(&pool, &params.q)
        .await
        .map_err(ApiResponse::store)?;
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Search completed",
        clients,
    ))
}

/// Soft-deletes an active client (moves it to the trash partition).
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client moved to trash", body = Client),
        (status = 404, description = "Client not found in the active partition"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_client(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Client>, ApiResponse<()>> {
    let client = store::soft_delete_client(&pool, id, today())
        .await
        .map_err(ApiResponse::store)?;

    ActivityEntryBuilder::new(ACTION_CLIENT_DELETED, &claims)
        .details(format!("deleted client ({})", client.name))
        .affected(client.id, AFFECTED_CLIENT)
        .extra(json!({ "previous_status": client.status }))
        .record(&pool)
        .await;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Client deleted successfully",
        client,
    ))
}

/// Restores a trashed client to the active partition.
#[utoipa::path(
    post,
    path = "/clients/{id}/restore",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client restored", body = Client),
        (status = 404, description = "Client not found in the trash partition"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn restore_client(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<Client>, ApiResponse<()>> {
    let client = store::restore_client(&pool, id)
        .await
        .map_err(ApiResponse::store)?;

    ActivityEntryBuilder::new(ACTION_CLIENT_RESTORED, &claims)
        .details(format!("restored client ({})", client.name))
        .affected(client.id, AFFECTED_CLIENT)
        .extra(json!({ "current_status": client.status }))
        .record(&pool)
        .await;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Client restored successfully",
        client,
    ))
}

/// Irrecoverably removes a trashed client. Admin/superadmin only; the role
/// gate is enforced inside the store layer.
#[utoipa::path(
    delete,
    path = "/clients/{id}/permanent",
    tag = "Clients",
    params(("id" = i32, Path, description = "Client ID")),
    responses(
        (status = 200, description = "Client permanently deleted"),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "Client not found in the trash partition"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn permanently_delete_client(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let client = store::permanently_delete_client(&pool, id, &claims.role)
        .await
        .map_err(ApiResponse::store)?;

    ActivityEntryBuilder::new(ACTION_CLIENT_PURGED, &claims)
        .details(format!("permanently deleted client ({})", client.name))
        .affected(client.id, AFFECTED_CLIENT)
        .extra(json!({ "previous_status": client.status }))
        .record(&pool)
        .await;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Client permanently deleted",
        (),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(field: &str) -> FieldChange {
        FieldChange {
            field: field.to_string(),
            old: "a".to_string(),
            new: "b".to_string(),
        }
    }

    #[test]
    fn lone_status_flip_is_tagged_as_a_status_change() {
        let changes = vec![change("status")];
        assert_eq!(update_action(&changes, "approved"), ACTION_STATUS_CHANGED);
    }

    #[test]
    fn notes_only_change_under_tammam_is_a_notes_update() {
        let changes = vec![change("installment_notes")];
        assert_eq!(update_action(&changes, STATUS_TAMMAM), ACTION_NOTES_UPDATED);
        // Outside tammam it is an ordinary edit.
        assert_eq!(update_action(&changes, "approved"), ACTION_CLIENT_EDITED);
    }

    #[test]
    fn multi_field_changes_are_plain_edits() {
        let changes = vec![change("status"), change("name")];
        assert_eq!(update_action(&changes, "approved"), ACTION_CLIENT_EDITED);
        assert_eq!(update_action(&[], "approved"), ACTION_CLIENT_EDITED);
    }
}
