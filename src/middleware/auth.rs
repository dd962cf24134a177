use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::api::auth::Claims;
use crate::config::Config;
use crate::utils::api_response::ApiResponse;
use crate::utils::token;

/// Pull the session token out of the `token` cookie, falling back to an
/// `Authorization: Bearer` header for non-browser clients.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        for pair in cookies.split(';') {
            if let Some(value) = pair.trim().strip_prefix("token=") {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Verifies the session token and threads `Claims` through request
/// extensions. Every failure is a terminal 401 before any handler runs.
pub async fn session_middleware(mut req: Request<Body>, next: Next) -> Result<Response, Response> {
    let token = token_from_headers(req.headers()).ok_or_else(|| {
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing session token", None)
            .into_response()
    })?;

    let claims =
        token::verify_session(&token, Config::get().jwt_secret.as_bytes()).map_err(|e| {
            tracing::warn!("session token rejected: {e}");
            ApiResponse::<()>::error(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired session token",
                Some(json!({ "error": e.to_string() })),
            )
            .into_response()
        })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Layered inside `session_middleware` on the /admin router; rejects any
/// identity that is not an admin.
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, Response> {
    let claims = req.extensions().get::<Claims>().ok_or_else(|| {
        ApiResponse::<()>::error(StatusCode::UNAUTHORIZED, "Missing session claims", None)
            .into_response()
    })?;

    if !claims.is_admin() {
        tracing::warn!(user = %claims.sub, "admin route refused for non-admin user");
        return Err(
            ApiResponse::<()>::forbidden("Administrator access required").into_response(),
        );
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_token_wins_over_missing_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; token=abc.def.ghi"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn bearer_header_is_a_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer abc.def.ghi"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn empty_cookie_value_falls_through() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("token="));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer xyz"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn no_credentials_yields_none() {
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }
}
