use axum::{Json, extract::State, http::HeaderMap, http::StatusCode, response::IntoResponse};
use tracing::debug;

use chirp_types::api::{USER_UPGRADED_EVENT, WebhookEvent};

use crate::auth::{AppState, blocking};
use crate::error::ApiError;
use crate::middleware::{authorization, authorize_api_key};

/// Payment provider callback. Only `user.upgraded` does anything; other
/// events are acknowledged and ignored.
pub async fn polka(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<WebhookEvent>,
) -> Result<impl IntoResponse, ApiError> {
    authorize_api_key(authorization(&headers), &state.polka_key)?;

    if event.event != USER_UPGRADED_EVENT {
        debug!("Ignoring webhook event {:?}", event.event);
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = event
        .data
        .user_id
        .ok_or_else(|| ApiError::ValidationFailed("data.user_id is required".into()))?;

    blocking(move || state.sessions.upgrade(user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
