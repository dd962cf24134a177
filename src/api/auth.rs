use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::config::Config;
use crate::utils::api_response::ApiResponse;
use crate::utils::token;

/// JWT Claims used for authentication.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject - User ID as String
    pub sub: String,
    /// Email of the authenticated user.
    pub email: String,
    /// Role assigned to the user (admin / user)
    pub role: String,
    /// Expiration timestamp (UNIX TIME)
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    /// Converts `sub` (user ID) to `i32`, or returns a descriptive error.
    pub fn user_id(&self) -> Result<i32, ApiResponse<()>> {
        self.sub.parse::<i32>().map_err(|_| {
            ApiResponse::error(
                StatusCode::UNAUTHORIZED,
                "Invalid user ID format in token",
                None,
            )
        })
    }
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

fn session_cookie(token: &str) -> String {
    format!(
        "token={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        token,
        token::SESSION_TTL_SECS
    )
}

fn clear_session_cookie() -> &'static str {
    "token=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax"
}

/// Handles user registration.
///
/// Emails are lowercased before storage so uniqueness is case-insensitive.
/// Every signup gets the `user` role; admins are promoted out of band.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered"),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "Email already registered"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ApiResponse<i32>, ApiResponse<()>> {
    let name = payload.name.trim();
    let email = payload.email.trim().to_lowercase();

    if name.is_empty() || payload.password.is_empty() {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Name and password are required",
            None,
        ));
    }
    if !email.contains('@') {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "A valid email address is required",
            None,
        ));
    }

    let password_hash = hash(&payload.password, DEFAULT_COST).map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let result = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, 'user') RETURNING id",
    )
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await;

    match result {
        Ok(id) => {
            info!("registered new user {email}");
            Ok(ApiResponse::success(StatusCode::CREATED, "User registered", id))
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                    return Err(ApiResponse::error(
                        StatusCode::CONFLICT,
                        "Email already registered",
                        None,
                    ));
                }
            }
            Err(ApiResponse::db_error("Failed to register user", e))
        }
    }
}

#[derive(sqlx::FromRow)]
struct LoginRow {
    id: i32,
    email: String,
    password_hash: String,
    role: String,
}

/// Handles user login.
///
/// On success the JWT is returned in the body and set as an HTTP-only
/// session cookie with a 7-day lifetime.
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = LoginResponse),
        (status = 401, description = "Invalid email or password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn login(
    State(pool): State<PgPool>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiResponse<()>> {
    let email = payload.email.trim().to_lowercase();

    let user = sqlx::query_as::<_, LoginRow>(
        "SELECT id, email, password_hash, role FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Database error", e))?;

    let Some(user) = user else {
        warn!("login attempt for unknown email: {email}");
        return Err(ApiResponse::error(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
            None,
        ));
    };

    match verify(&payload.password, &user.password_hash) {
        Ok(true) => {
            let jwt = token::issue_session(
                user.id,
                &user.email,
                &user.role,
                Config::get().jwt_secret.as_bytes(),
            )
            .map_err(|e| {
                ApiResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Token generation failed",
                    Some(json!({ "error": e.to_string() })),
                )
            })?;

            info!("login successful for {email}");
            Ok((
                [(header::SET_COOKIE, session_cookie(&jwt))],
                Json(LoginResponse {
                    token: jwt,
                    role: user.role,
                }),
            ))
        }
        Ok(false) => {
            warn!("invalid password attempt for {email}");
            Err(ApiResponse::error(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
                None,
            ))
        }
        Err(e) => Err(ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password verification error",
            Some(json!({ "error": e.to_string() })),
        )),
    }
}

/// Clears the session cookie. The token itself stays valid until expiry;
/// there is no server-side session store to invalidate.
#[utoipa::path(
    get,
    path = "/auth/logout",
    tag = "Authentication",
    responses(
        (status = 200, description = "Session cookie cleared")
    ),
    security(("bearerAuth" = []))
)]
pub async fn logout(Extension(claims): Extension<Claims>) -> impl IntoResponse {
    info!(user = %claims.sub, "logout");
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        ApiResponse::success(StatusCode::OK, "Logged out", ()),
    )
}

/// Allows an authenticated user to change their own password after
/// verifying the current one.
#[utoipa::path(
    post,
    path = "/auth/change_password",
    tag = "Authentication",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated successfully"),
        (status = 401, description = "Old password incorrect"),
        (status = 404, description = "User does not exist"),
        (status = 500, description = "Internal Server Error")
    ),
    security(("bearerAuth" = []))
)]
pub async fn change_password(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let user_id = claims.user_id()?;

    let stored: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&pool)
            .await
            .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(stored) = stored else {
        return Err(ApiResponse::not_found("User not found"));
    };

    let is_valid = verify(&payload.old_password, &stored).unwrap_or(false);
    if !is_valid {
        return Err(ApiResponse::error(
            StatusCode::UNAUTHORIZED,
            "Incorrect old password",
            None,
        ));
    }

    let new_password_hash = hash(&payload.new_password, DEFAULT_COST).map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
        .bind(&new_password_hash)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to update password", e))?;

    Ok(ApiResponse::success(
        StatusCode::OK,
        "Password updated successfully",
        (),
    ))
}

/// Issues a one-hour reset token, persists it on the user row for
/// single-use invalidation, and logs the reset link. The response is the
/// same whether or not the email exists.
#[utoipa::path(
    post,
    path = "/auth/forgot_password",
    tag = "Authentication",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset link issued if the account exists"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn forgot_password(
    State(pool): State<PgPool>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let email = payload.email.trim().to_lowercase();

    let user: Option<i32> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    if let Some(user_id) = user {
        let reset = token::issue_reset(user_id, &email, Config::get().jwt_secret.as_bytes())
            .map_err(|e| {
                ApiResponse::error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Token generation failed",
                    Some(json!({ "error": e.to_string() })),
                )
            })?;

        sqlx::query(
            "UPDATE users SET reset_token = $1, reset_token_expires = NOW() + INTERVAL '1 hour', \
             updated_at = NOW() WHERE id = $2",
        )
        .bind(&reset)
        .bind(user_id)
        .execute(&pool)
        .await
        .map_err(|e| ApiResponse::db_error("Failed to store reset token", e))?;

        // No mailer is wired up; the link goes to the log for delivery.
        info!("password reset link for {email}: /reset?token={reset}");
    } else {
        warn!("password reset requested for unknown email: {email}");
    }

    Ok(ApiResponse::success(
        StatusCode::OK,
        "If that email is registered, a reset link has been sent",
        (),
    ))
}

/// Completes a password reset. The token must carry a valid signature,
/// be unexpired, and match the token stored on the user row; the stored
/// copy is cleared afterward so a link cannot be replayed.
#[utoipa::path(
    post,
    path = "/auth/reset_password",
    tag = "Authentication",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset successfully"),
        (status = 401, description = "Invalid, expired, or already-used token"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn reset_password(
    State(pool): State<PgPool>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<ApiResponse<()>, ApiResponse<()>> {
    let claims = token::verify_reset(&payload.token, Config::get().jwt_secret.as_bytes())
        .map_err(|e| {
            warn!("reset token rejected: {e}");
            ApiResponse::error(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired reset token",
                None,
            )
        })?;

    let user_id: i32 = claims.sub.parse().map_err(|_| {
        ApiResponse::error(StatusCode::UNAUTHORIZED, "Invalid reset token", None)
    })?;

    #[derive(sqlx::FromRow)]
    struct ResetRow {
        reset_token: Option<String>,
        expired: bool,
    }

    let row = sqlx::query_as::<_, ResetRow>(
        "SELECT reset_token, (reset_token_expires IS NULL OR reset_token_expires < NOW()) AS expired \
         FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Database query failed", e))?;

    let Some(row) = row else {
        return Err(ApiResponse::not_found("User not found"));
    };

    let matches_stored = row.reset_token.as_deref() == Some(payload.token.as_str());
    if !matches_stored || row.expired {
        return Err(ApiResponse::error(
            StatusCode::UNAUTHORIZED,
            "Invalid, expired, or already-used reset token",
            None,
        ));
    }

    let new_password_hash = hash(&payload.new_password, DEFAULT_COST).map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    sqlx::query(
        "UPDATE users SET password_hash = $1, reset_token = NULL, reset_token_expires = NULL, \
         updated_at = NOW() WHERE id = $2",
    )
    .bind(&new_password_hash)
    .bind(user_id)
    .execute(&pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to reset password", e))?;

    info!("password reset completed for user {user_id}");
    Ok(ApiResponse::success(
        StatusCode::OK,
        "Password reset successfully",
        (),
    ))
}

/// Public authentication routes: no session required.
pub fn auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/forgot_password", post(forgot_password))
        .route("/auth/reset_password", post(reset_password))
}

/// Authenticated authentication routes.
pub fn secure_auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/logout", get(logout))
        .route("/auth/change_password", post(change_password))
}

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::Modify;
use utoipa::OpenApi;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut components = openapi.components.clone().unwrap_or(Components::default());
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
        openapi.components = Some(components);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(register, login, logout, change_password, forgot_password, reset_password),
    components(
        schemas(
            RegisterRequest, LoginRequest, LoginResponse,
            ChangePasswordRequest, ForgotPasswordRequest, ResetPasswordRequest
        )
    ),
    tags(
        (name = "Authentication", description = "User Auth Endpoints")
    ),
    modifiers(&SecurityAddon)
)]
pub struct AuthDoc;
