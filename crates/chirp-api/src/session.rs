//! Session manager: registration, login, refresh, revocation and profile
//! updates on top of the token codec, the access gate and the store.
//!
//! All methods block (Argon2 and file I/O). Async callers go through
//! [`crate::auth::blocking`].

use std::sync::Arc;

use tracing::{debug, info};

use chirp_db::Database;
use chirp_types::api::TokenRole;
use chirp_types::models::{UserId, UserView};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AccessGate;
use crate::password::{DUMMY_HASH, hash_password, verify_password};
use crate::token::TokenCodec;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserView,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionManager {
    db: Arc<Database>,
    tokens: TokenCodec,
    gate: AccessGate,
}

impl SessionManager {
    pub fn new(db: Arc<Database>, tokens: TokenCodec, gate: AccessGate) -> Self {
        Self { db, tokens, gate }
    }

    pub fn register(&self, email: &str, password: &str) -> ApiResult<UserView> {
        validate_credentials(email, password)?;

        // Hash before taking the store lock.
        let password_hash = hash_password(password)?;

        let user = self.db.transaction(|doc| {
            if doc.email_taken(email, None) {
                return Err(ApiError::ValidationFailed("email already registered".into()));
            }
            Ok(doc.insert_user(email, &password_hash)?)
        })?;

        info!("Registered user {}", user.id);
        Ok(user.view())
    }

    /// Unknown email and wrong password are both plain `Unauthorized`, and
    /// both pay for one Argon2 verification.
    pub fn login(&self, email: &str, password: &str) -> ApiResult<Session> {
        let Some(user) = self.db.find_user_by_email(email)? else {
            verify_password(password, DUMMY_HASH)?;
            debug!("Login failed: unknown email");
            return Err(ApiError::Unauthorized);
        };

        if !verify_password(password, &user.password_hash)? {
            debug!("Login failed: bad password for user {}", user.id);
            return Err(ApiError::Unauthorized);
        }

        let access_token = self.tokens.issue(user.id, TokenRole::Access)?;
        let refresh_token = self.tokens.issue(user.id, TokenRole::Refresh)?;

        info!("User {} logged in", user.id);
        Ok(Session {
            user: user.view(),
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a live refresh token. The refresh token
    /// itself stays valid.
    pub fn refresh(&self, refresh_token: &str) -> ApiResult<String> {
        let user_id = self.gate.authenticate_token(refresh_token, TokenRole::Refresh)?;
        Ok(self.tokens.issue(user_id, TokenRole::Access)?)
    }

    /// Record `token` as revoked, whatever it is. Always succeeds unless the
    /// store fails.
    pub fn revoke(&self, token: &str) -> ApiResult<()> {
        if token.is_empty() {
            return Ok(());
        }
        self.db.revoke_token(token)?;
        info!("Token revoked");
        Ok(())
    }

    pub fn update_profile(
        &self,
        access_token: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<UserView> {
        let user_id = self.gate.authenticate_token(access_token, TokenRole::Access)?;
        validate_credentials(email, password)?;

        let password_hash = hash_password(password)?;

        let user = self.db.transaction(|doc| {
            if doc.email_taken(email, Some(user_id)) {
                return Err(ApiError::ValidationFailed("email already registered".into()));
            }
            doc.set_credentials(user_id, email, &password_hash)
                .ok_or(ApiError::NotFound("user"))
        })?;

        info!("User {} updated their profile", user.id);
        Ok(user.view())
    }

    /// Grant the privileged tier. Idempotent.
    pub fn upgrade(&self, user_id: UserId) -> ApiResult<UserView> {
        let user = self
            .db
            .upgrade_user(user_id)?
            .ok_or(ApiError::NotFound("user"))?;
        info!("User {} upgraded", user.id);
        Ok(user.view())
    }
}

fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    if email.trim().is_empty() {
        return Err(ApiError::ValidationFailed("email is required".into()));
    }
    if password.is_empty() {
        return Err(ApiError::ValidationFailed("password is required".into()));
    }
    Ok(())
}
