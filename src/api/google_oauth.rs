use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bcrypt::{hash, DEFAULT_COST};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::config::Config;
use crate::utils::api_response::ApiResponse;
use crate::utils::token;

#[derive(Deserialize, ToSchema, IntoParams)]
pub struct GoogleAuthCallback {
    pub code: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub id_token: String,
}

#[derive(Deserialize, Serialize)]
pub struct GoogleUserInfo {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthToken {
    pub token: String,
    pub role: String,
}

struct GoogleSettings {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

fn google_settings() -> Result<GoogleSettings, ApiResponse<()>> {
    let config = Config::get();
    match (
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.google_redirect_uri.clone(),
    ) {
        (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(GoogleSettings {
            client_id,
            client_secret,
            redirect_uri,
        }),
        _ => Err(ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Google OAuth is not configured",
            None,
        )),
    }
}

/// Redirect the browser to the Google consent screen.
#[utoipa::path(
    get,
    path = "/auth/google",
    tag = "Google OAuth",
    responses(
        (status = 302, description = "Redirect to Google OAuth"),
        (status = 500, description = "Google OAuth not configured")
    )
)]
pub async fn google_auth_redirect() -> Result<Redirect, ApiResponse<()>> {
    let settings = google_settings()?;

    let google_auth_url = format!(
        "https://accounts.google.com/o/oauth2/auth?client_id={}&redirect_uri={}&response_type=code&scope=email%20profile&access_type=offline",
        settings.client_id, settings.redirect_uri
    );

    Ok(Redirect::to(&google_auth_url))
}

/// Handle the Google OAuth callback: exchange the code, decode the
/// ID-token payload, and map the Google identity to a local account.
///
/// An email that was registered with a password is refused here rather
/// than silently linked, so a Google login can never take over a
/// password account.
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    tag = "Google OAuth",
    params(GoogleAuthCallback),
    responses(
        (status = 200, description = "Authenticated via Google", body = AuthToken),
        (status = 409, description = "Email is registered with a password"),
        (status = 500, description = "Internal Server Error")
    )
)]
pub async fn google_auth_callback(
    Query(params): Query<GoogleAuthCallback>,
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, ApiResponse<()>> {
    let settings = google_settings()?;
    let client = Client::new();

    let token_response: GoogleTokenResponse = client
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("client_id", settings.client_id.as_str()),
            ("client_secret", settings.client_secret.as_str()),
            ("code", &params.code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", settings.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to exchange auth code",
                Some(json!({ "error": e.to_string() })),
            )
        })?
        .json()
        .await
        .map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to parse token response",
                Some(json!({ "error": e.to_string() })),
            )
        })?;

    let id_token_parts: Vec<&str> = token_response.id_token.split('.').collect();
    if id_token_parts.len() != 3 {
        return Err(ApiResponse::error(
            StatusCode::BAD_REQUEST,
            "Invalid ID Token format",
            None,
        ));
    }

    let decoded_json = URL_SAFE_NO_PAD.decode(id_token_parts[1]).map_err(|_| {
        ApiResponse::error(StatusCode::BAD_REQUEST, "Failed to decode ID Token", None)
    })?;

    let user_info: GoogleUserInfo = serde_json::from_slice(&decoded_json).map_err(|_| {
        ApiResponse::error(StatusCode::BAD_REQUEST, "Failed to parse user info", None)
    })?;

    let (user_id, email, role) = find_or_create_user(&pool, &user_info).await?;

    let jwt = token::issue_session(user_id, &email, &role, Config::get().jwt_secret.as_bytes())
        .map_err(|e| {
            ApiResponse::error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Token generation failed",
                Some(json!({ "error": e.to_string() })),
            )
        })?;

    let cookie = format!(
        "token={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        jwt,
        token::SESSION_TTL_SECS
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(AuthToken { token: jwt, role }),
    ))
}

#[derive(sqlx::FromRow)]
struct OAuthUserRow {
    id: i32,
    role: String,
    google_linked: bool,
}

/// Map a Google identity to a local account: issue for a linked account,
/// refuse a password account, create for an unknown email.
async fn find_or_create_user(
    pool: &PgPool,
    google_user: &GoogleUserInfo,
) -> Result<(i32, String, String), ApiResponse<()>> {
    let email = google_user.email.trim().to_lowercase();

    let existing = sqlx::query_as::<_, OAuthUserRow>(
        "SELECT id, role, google_linked FROM users WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiResponse::db_error("Database error", e))?;

    if let Some(user) = existing {
        if !user.google_linked {
            warn!("google login refused for password-registered email {email}");
            return Err(ApiResponse::error(
                StatusCode::CONFLICT,
                "This email is registered with a password. Please sign in with your password.",
                None,
            ));
        }
        return Ok((user.id, email, user.role));
    }

    // First Google login: create an account with an unguessable
    // placeholder password so the password path stays closed.
    let placeholder = hash(Uuid::new_v4().to_string(), DEFAULT_COST).map_err(|e| {
        ApiResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Password hashing failed",
            Some(json!({ "error": e.to_string() })),
        )
    })?;

    let new_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (name, email, password_hash, role, google_linked, image) \
         VALUES ($1, $2, $3, 'user', TRUE, $4) RETURNING id",
    )
    .bind(&google_user.name)
    .bind(&email)
    .bind(&placeholder)
    .bind(&google_user.picture)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiResponse::db_error("Failed to create user", e))?;

    info!("created user {new_id} from Google login ({email})");
    Ok((new_id, email, "user".to_string()))
}

/// Register Google OAuth routes (public, matches `auth_routes`).
pub fn g_auth_routes() -> Router<PgPool> {
    Router::new()
        .route("/auth/google", get(google_auth_redirect))
        .route("/auth/google/callback", get(google_auth_callback))
}

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        google_auth_redirect,
        google_auth_callback
    ),
    components(schemas(GoogleAuthCallback, AuthToken)),
    tags(
        (name = "Google OAuth", description = "Google-based OAuth endpoints")
    )
)]
pub struct GoogleOAuthDoc;
