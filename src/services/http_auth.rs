//! API token issuance, verification and the axum middleware that enforces
//! role-based access.
//!
//! Tokens are HS256 JWTs whose claims carry the role as `type` plus the
//! standard `iat` and `exp` (unix seconds).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header carrying a bare token as an alternative to `Authorization`.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Access level granted by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// All routes.
    Admin,
    /// Read-only routes.
    User,
}

impl Role {
    /// Whether a token with this role may call a route requiring `required`.
    pub fn allows(self, required: Role) -> bool {
        self == Role::Admin || required == Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "type")]
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("token lifetime out of range")]
    InvalidTtl,

    #[error("failed to sign token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            _ => Self::Malformed,
        }
    }
}

/// Issues and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_ref()),
            decoding: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }

    /// Issue a token valid for `ttl` from now.
    pub fn issue(&self, role: Role, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(role, Utc::now(), ttl)
    }

    pub fn issue_at(
        &self,
        role: Role,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let expires = now.checked_add_signed(ttl).ok_or(TokenError::InvalidTtl)?;
        let claims = Claims {
            role,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encoding)
    }

    /// Verify signature, algorithm and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

// ---------- axum integration ----------

use crate::error::AppError;
use crate::services::http_api::ApiErr;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Middleware state: the signer plus the role a route group requires.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    pub signer: TokenSigner,
    pub required: Role,
}

impl RoleGuard {
    pub fn new(signer: TokenSigner, required: Role) -> Self {
        Self { signer, required }
    }
}

/// Pull the token from `Authorization: Bearer` or `X-Api-Key`.
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    bearer
        .or_else(|| {
            headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
        })
        .filter(|t| !t.is_empty())
}

/// axum middleware that rejects requests without a valid token of a
/// sufficient role. Returns 401 JSON otherwise.
pub async fn require_role(
    State(guard): State<RoleGuard>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers()) else {
        return ApiErr(AppError::unauthorized("missing API token")).into_response();
    };

    match guard.signer.verify(token) {
        Ok(claims) if claims.role.allows(guard.required) => next.run(request).await,
        Ok(claims) => {
            log::warn!(
                "{} token rejected on {} route {}",
                claims.role,
                guard.required,
                request.uri().path()
            );
            ApiErr(AppError::unauthorized(format!(
                "{} role required",
                guard.required
            )))
            .into_response()
        }
        Err(err) => {
            log::warn!("token rejected on {}: {}", request.uri().path(), err);
            ApiErr(AppError::unauthorized(err.to_string())).into_response()
        }
    }
}
