use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use chirp_db::Database;
use chirp_db::models::PostRecord;
use chirp_types::api::TokenRole;
use chirp_types::models::UserId;

use crate::auth::{AppState, blocking};
use crate::error::{ApiError, ApiResult};
use crate::token::TokenCodec;

pub const BEARER_PREFIX: &str = "Bearer ";
pub const API_KEY_PREFIX: &str = "ApiKey ";

/// Identity attached to a request by [`require_auth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
}

/// Turns a presented bearer token into a user id, or refuses.
///
/// Every token use is checked against the revocation ledger, whatever its
/// role.
#[derive(Clone)]
pub struct AccessGate {
    db: Arc<Database>,
    tokens: TokenCodec,
}

impl AccessGate {
    pub fn new(db: Arc<Database>, tokens: TokenCodec) -> Self {
        Self { db, tokens }
    }

    /// Authenticate a raw `Authorization` header value.
    pub fn authenticate(&self, header: Option<&str>, role: TokenRole) -> ApiResult<UserId> {
        let token = bearer_token(header)?;
        self.authenticate_token(token, role)
    }

    /// Authenticate a token with the scheme prefix already stripped.
    pub fn authenticate_token(&self, token: &str, role: TokenRole) -> ApiResult<UserId> {
        let user_id = self.tokens.verify(token, role).map_err(|e| {
            debug!("Rejected {:?} token: {}", role, e);
            ApiError::from(e)
        })?;

        if self.db.is_revoked(token)? {
            debug!("Rejected revoked {:?} token for user {}", role, user_id);
            return Err(ApiError::Unauthorized);
        }

        Ok(user_id)
    }
}

/// Strip the `Bearer ` scheme. A missing header or another scheme is
/// unauthorized.
pub fn bearer_token(header: Option<&str>) -> ApiResult<&str> {
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .ok_or(ApiError::Unauthorized)
}

/// Check an `ApiKey <key>` header against the configured key, byte for byte.
/// An unconfigured (empty) key accepts nothing.
pub fn authorize_api_key(header: Option<&str>, expected: &str) -> ApiResult<()> {
    let key = header
        .and_then(|h| h.strip_prefix(API_KEY_PREFIX))
        .ok_or(ApiError::Unauthorized)?;

    if key.is_empty() || expected.is_empty() || key.as_bytes() != expected.as_bytes() {
        return Err(ApiError::Unauthorized);
    }
    Ok(())
}

pub fn ensure_owner(post: &PostRecord, subject: UserId) -> ApiResult<()> {
    if post.author_id != subject {
        debug!(
            "User {} tried to modify post {} owned by {}",
            subject, post.id, post.author_id
        );
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

pub fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Require a valid access token and attach [`AuthUser`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = authorization(req.headers()).map(str::to_owned);

    let id = blocking(move || {
        state
            .gate
            .authenticate(header.as_deref(), TokenRole::Access)
    })
    .await?;

    req.extensions_mut().insert(AuthUser { id });
    Ok(next.run(req).await)
}
