use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use tracing::error;

use chirp_db::Database;
use chirp_types::api::{CredentialsRequest, LoginResponse, TokenResponse};

use crate::error::{ApiError, ApiResult};
use crate::middleware::{AccessGate, authorization, bearer_token};
use crate::session::SessionManager;
use crate::token::TokenCodec;

pub type AppState = Arc<AppStateInner>;

/// Everything a request handler may touch. Built once at startup and dropped
/// at shutdown.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub gate: AccessGate,
    pub sessions: SessionManager,
    /// Shared key the payment provider presents on webhooks.
    pub polka_key: String,
    /// Static file hits since start or last reset.
    pub file_server_hits: AtomicU64,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: &[u8], polka_key: String) -> Self {
        let db = Arc::new(db);
        let tokens = TokenCodec::new(jwt_secret);
        let gate = AccessGate::new(Arc::clone(&db), tokens.clone());
        let sessions = SessionManager::new(Arc::clone(&db), tokens, gate.clone());

        Self {
            db,
            gate,
            sessions,
            polka_key,
            file_server_hits: AtomicU64::new(0),
        }
    }
}

/// Run blocking core work (Argon2, store I/O) off the async workers.
pub async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::ServerFailure(e.to_string())
    })?
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = blocking(move || state.sessions.register(&req.email, &req.password)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session = blocking(move || state.sessions.login(&req.email, &req.password)).await?;

    Ok(Json(LoginResponse::new(
        session.user,
        session.access_token,
        session.refresh_token,
    )))
}

pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(authorization(&headers))?.to_string();

    let user = blocking(move || {
        state
            .sessions
            .update_profile(&token, &req.email, &req.password)
    })
    .await?;

    Ok(Json(user))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(authorization(&headers))?.to_string();
    let access = blocking(move || state.sessions.refresh(&token)).await?;
    Ok(Json(TokenResponse { token: access }))
}

/// Revocation never fails on the token itself: whatever follows the scheme
/// (or the whole header, if there is no scheme) is recorded.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = authorization(&headers)
        .map(|h| bearer_token(Some(h)).unwrap_or(h).to_string())
        .unwrap_or_default();

    blocking(move || state.sessions.revoke(&token)).await?;
    Ok(StatusCode::OK)
}
