use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use bcrypt::{hash, verify, DEFAULT_COST};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::{OpenApi, ToSchema};

use crate::config::Config;
use crate::db::models::user::{User, ROLE_ADMIN, ROLE_EMPLOYEE, ROLE_SUPERADMIN};
use crate::utils::api_response::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(register, login),
    components(schemas(RegisterRequest, LoginRequest, LoginResponse))
)]
pub struct AuthDoc;

/// JWT Claims used for authentication. This is the session context object
/// passed into every component that needs the actor's identity.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// The username of the authenticated user.
    pub username: String,
    /// The role assigned to the user.
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    /// Converts `sub` (user ID) to `i32`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::BAD_REQUEST,
                "Invalid user ID format in token",
                None,
            )
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_SUPERADMIN
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == ROLE_SUPERADMIN
    }
}

/// Represents a request to register a new user.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Desired username
    pub username: String,
    /// User Password
    pub password: String,
}

/// Represents a request to log in.
#[derive(Serialize, Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Represents a successful login response returning a JWT token.
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

/// Registers a new account. Self-registration always produces an employee;
/// only a superadmin can elevate the role afterwards.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<i32>, ApiResponse<()>> {
    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
            None,
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to hash password",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(payload.username.trim())
    .bind(&password_hash)
    .bind(ROLE_EMPLOYEE)
    .fetch_one(&pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => ApiResponse::error(
            StatusCode::CONFLICT,
            "This username is already in use",
            None,
        ),
        _ => ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to create account",
            Some(json!({ "db_error": e.to_string() })),
        ),
    })?;

    info!("✅ Registered new account: {}", payload.username.trim());
    Ok(ApiResponse::success(
        StatusCode::CREATED,
        "Account created successfully",
        user_id,
    ))
}

/// Handles user login.
///
/// Verifies the credentials, refuses locked accounts and issues a JWT
/// carrying the actor's id, username and role.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body(
        content = LoginRequest,
        description = "User login details",
    ),
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid username or password"),
        (status = 403, description = "Account locked"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<ApiResponse<LoginResponse>, ApiResponse<()>> {
    let config = Config::get();

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error",
                Some(json!({ "db_error": e.to_string() })),
            )
        })?;

    let Some(user) = user else {
        warn!("❌ Login attempt for non-existent user: {}", payload.username);
        return Err(ApiResponse::error(
            StatusCode::UNAUTHORIZED,
            "Invalid username or password",
            None,
        ));
    };

    if user.account_locked {
        warn!("🔒 Login attempt for locked account: {}", payload.username);
        return Err(ApiResponse::error(
            StatusCode::FORBIDDEN,
            "Account is locked. Contact your administrator.",
            None,
        ));
    }

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!("❌ Invalid password attempt for user: {}", payload.username);
            return Err(ApiResponse::error(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
                None,
            ));
        }
        Err(e) => {
            return Err(ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password verification error",
                Some(json!({ "message": e.to_string() })),
            ));
        }
    }

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        exp: chrono::Utc::now().timestamp() as usize + 36000, // 10 hour expiration
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Token generation failed",
            Some(json!({ "message": e.to_string() })),
        )
    })?;

    // Best effort; a failed stamp must not block the login.
    if let Err(e) = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
    {
        warn!("failed to stamp last_login for {}: {e}", user.username);
    }

    info!("✅ Login successful for user: {}", payload.username);
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Login successful",
        LoginResponse {
            token,
            role: user.role,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: "3".to_string(),
            username: "someone".to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn admin_and_superadmin_count_as_admin() {
        assert!(claims(ROLE_ADMIN).is_admin());
        assert!(claims(ROLE_SUPERADMIN).is_admin());
        assert!(!claims(ROLE_EMPLOYEE).is_admin());
    }

    #[test]
    fn only_superadmin_is_superadmin() {
        assert!(claims(ROLE_SUPERADMIN).is_superadmin());
        assert!(!claims(ROLE_ADMIN).is_superadmin());
    }

    #[test]
    fn user_id_parses_the_subject() {
        assert_eq!(claims(ROLE_EMPLOYEE).user_id().ok(), Some(3));
        let mut bad = claims(ROLE_EMPLOYEE);
        bad.sub = "not-a-number".to_string();
        assert!(bad.user_id().is_err());
    }
}
