//! JWT issuing, verification and refresh

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use thiserror::Error;

use crate::{config::AuthConfig, error::AppError, models::TokenClaims};

/// Token failures; callers map each to its own response
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token")]
    SignatureInvalid,

    #[error("token expired")]
    Expired,

    #[error("unauthorized")]
    Malformed,

    #[error("token not expired enough")]
    NotExpiringSoon,

    #[error("could not create token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SignatureInvalid | TokenError::Expired | TokenError::Malformed => {
                AppError::Unauthorized(err.to_string())
            }
            TokenError::NotExpiringSoon => AppError::BadRequest(err.to_string()),
            TokenError::Signing(msg) => AppError::Internal(format!("could not create token: {}", msg)),
        }
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
    refresh_window_seconds: i64,
    refresh_grace_seconds: i64,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_seconds: config.token_ttl_seconds,
            refresh_window_seconds: config.refresh_window_seconds,
            refresh_grace_seconds: config.refresh_grace_seconds,
        }
    }

    /// Sign a token for `username` valid for the configured lifetime
    pub fn issue(&self, username: &str, role: &str) -> Result<String, TokenError> {
        self.issue_at(username, role, now())
    }

    pub fn issue_at(&self, username: &str, role: &str, now: i64) -> Result<String, TokenError> {
        let claims = TokenClaims {
            username: username.to_string(),
            role: role.to_string(),
            exp: now + self.ttl_seconds,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Check signature and expiry
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, now())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let claims = self.decode_signed(token)?;
        if claims.remaining(now) < 0 {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }

    /// Exchange a token close to (or just past) its expiry for a fresh one
    pub fn refresh(&self, token: &str) -> Result<String, TokenError> {
        self.refresh_at(token, now())
    }

    pub fn refresh_at(&self, token: &str, now: i64) -> Result<String, TokenError> {
        let claims = self.decode_signed(token)?;
        let remaining = claims.remaining(now);

        if remaining > self.refresh_window_seconds {
            return Err(TokenError::NotExpiringSoon);
        }
        if remaining < -self.refresh_grace_seconds {
            return Err(TokenError::Expired);
        }

        self.issue_at(&claims.username, &claims.role, now)
    }

    /// Decode with signature checks only; expiry is judged by the caller
    /// against its own clock.
    fn decode_signed(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
                _ => TokenError::Malformed,
            })
    }
}
