use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use serde_json::json;
use sqlx::PgPool;
use utoipa::OpenApi;

use crate::api::auth::Claims;
use crate::db::models::user::{
    UpdateLockRequest, UpdateRoleRequest, UserInfo, ROLE_ADMIN, ROLE_EMPLOYEE, ROLE_SUPERADMIN,
};
use crate::middleware::auth::forbidden;
use crate::utils::api_response::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(get_all_users, get_user, update_user_role, update_user_lock, delete_user),
    components(schemas(UserInfo, UpdateRoleRequest, UpdateLockRequest))
)]
pub struct UserDoc;

pub fn user_routes() -> Router<PgPool> {
    Router::new()
        .route("/users", get(get_all_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/users/{id}/role", put(update_user_role))
        .route("/users/{id}/lock", put(update_user_lock))
}

fn db_error(e: sqlx::Error) -> ApiResponse<()> {
    tracing::error!("user store failure: {e}");
    ApiResponse::error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "A database error occurred",
        Some(json!({ "db_error": e.to_string() })),
    )
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses(
        (status = 200, description = "List all accounts", body = [UserInfo]),
        (status = 403, description = "Caller is not an administrator"),
        (status = 500, description = "Failed to retrieve users")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_all_users(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<ApiResponse<Vec<UserInfo>>, ApiResponse<()>> {
    if !claims.is_admin() {
        return Err(forbidden("User management requires administrator privileges"));
    }

    let users = sqlx::query_as::<_, UserInfo>(
        "SELECT id, username, role, account_locked FROM users ORDER BY id",
    )
    .fetch_all(&pool)
    .await
    .map_err(db_error)?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Users retrieved successfully",
        users,
    ))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Retrieve a single account", body = UserInfo),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<UserInfo>, ApiResponse<()>> {
    if !claims.is_admin() {
        return Err(forbidden("User management requires administrator privileges"));
    }

    let user = sqlx::query_as::<_, UserInfo>(
        "SELECT id, username, role, account_locked FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&pool)
    .await
    .map_err(db_error)?
    .ok_or_else(|| ApiResponse::error(StatusCode::NOT_FOUND, "User not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "User retrieved successfully",
        user,
    ))
}

/// Role changes are the one place accounts get elevated, and only a
/// superadmin may do it.
#[utoipa::path(
    put,
    path = "/users/{id}/role",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserInfo),
        (status = 400, description = "Unknown role"),
        (status = 403, description = "Caller is not a superadmin"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user_role(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<ApiResponse<UserInfo>, ApiResponse<()>> {
    if !claims.is_superadmin() {
        return Err(forbidden("Only a superadmin may change roles"));
    }

    if ![ROLE_EMPLOYEE, ROLE_ADMIN, ROLE_SUPERADMIN].contains(&payload.role.as_str()) {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Unknown role",
            Some(json!({ "role": payload.role })),
        ));
    }

    let user = sqlx::query_as::<_, UserInfo>(
        "UPDATE users SET role = $2 WHERE id = $1 RETURNING id, username, role, account_locked",
    )
    .bind(id)
    .bind(&payload.role)
    .fetch_optional(&pool)
    .await
    .map_err(db_error)?
    .ok_or_else(|| ApiResponse::error(StatusCode::NOT_FOUND, "User not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Role updated successfully",
        user,
    ))
}

#[utoipa::path(
    put,
    path = "/users/{id}/lock",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateLockRequest,
    responses(
        (status = 200, description = "Lock flag updated", body = UserInfo),
        (status = 403, description = "Caller is not an administrator"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_user_lock(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLockRequest>,
) -> Result<ApiResponse<UserInfo>, ApiResponse<()>> {
    if !claims.is_admin() {
        return Err(forbidden("User management requires administrator privileges"));
    }

    let user = sqlx::query_as::<_, UserInfo>(
        "UPDATE users SET account_locked = $2 WHERE id = $1 RETURNING id, username, role, account_locked",
    )
    .bind(id)
    .bind(payload.account_locked)
    .fetch_optional(&pool)
    .await
    .map_err(db_error)?
    .ok_or_else(|| ApiResponse::error(StatusCode::NOT_FOUND, "User not found", None))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Account lock updated successfully",
        user,
    ))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Account removed"),
        (status = 403, description = "Caller is not a superadmin"),
        (status = 404, description = "User not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_user(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i32>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    if !claims.is_superadmin() {
        return Err(forbidden("Only a superadmin may remove accounts"));
    }

    let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(db_error)?;

    if deleted.rows_affected() == 0 {
        return Err(ApiResponse::error(
            StatusCode::NOT_FOUND,
            "User not found",
            None,
        ));
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Account removed successfully",
        (),
    ))
}
