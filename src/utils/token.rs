use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::auth::Claims;

/// Session tokens live for 7 days, matching the cookie Max-Age.
pub const SESSION_TTL_SECS: usize = 7 * 24 * 3600;
/// Password-reset links expire after one hour.
pub const RESET_TTL_SECS: usize = 3600;

const RESET_PURPOSE: &str = "password_reset";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is expired")]
    Expired,
    #[error("token is not valid for this purpose")]
    WrongPurpose,
    #[error("invalid token: {0}")]
    Invalid(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e),
        }
    }
}

/// Claims carried by a password-reset token. Separate from the session
/// claims so a reset link can never be replayed as a login.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: String,
    pub email: String,
    pub purpose: String,
    pub exp: usize,
}

pub fn issue_session(
    user_id: i32,
    email: &str,
    role: &str,
    secret: &[u8],
) -> Result<String, TokenError> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: Utc::now().timestamp() as usize + SESSION_TTL_SECS,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

pub fn verify_session(token: &str, secret: &[u8]) -> Result<Claims, TokenError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn issue_reset(user_id: i32, email: &str, secret: &[u8]) -> Result<String, TokenError> {
    let claims = ResetClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        purpose: RESET_PURPOSE.to_string(),
        exp: Utc::now().timestamp() as usize + RESET_TTL_SECS,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

pub fn verify_reset(token: &str, secret: &[u8]) -> Result<ResetClaims, TokenError> {
    let data = decode::<ResetClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &Validation::default(),
    )?;
    if data.claims.purpose != RESET_PURPOSE {
        return Err(TokenError::WrongPurpose);
    }
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret";

    #[test]
    fn session_round_trip() {
        let token = issue_session(7, "user@example.com", "user", SECRET).unwrap();
        let claims = verify_session(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.email, "user@example.com");
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn session_rejects_wrong_secret() {
        let token = issue_session(7, "user@example.com", "user", SECRET).unwrap();
        assert!(verify_session(&token, b"other-secret").is_err());
    }

    #[test]
    fn reset_token_cannot_open_a_session() {
        let token = issue_reset(7, "user@example.com", SECRET).unwrap();
        let err = verify_session(&token, SECRET);
        // session claims require a role field the reset token does not carry
        assert!(err.is_err());
    }

    #[test]
    fn session_token_is_not_a_reset_token() {
        let token = issue_session(7, "user@example.com", "user", SECRET).unwrap();
        assert!(verify_reset(&token, SECRET).is_err());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let claims = ResetClaims {
            sub: "7".into(),
            email: "user@example.com".into(),
            purpose: "password_reset".into(),
            exp: Utc::now().timestamp() as usize - 120,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert!(matches!(
            verify_reset(&token, SECRET),
            Err(TokenError::Expired)
        ));
    }
}
