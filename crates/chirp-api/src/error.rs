use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use chirp_db::StoreError;
use chirp_types::api::ErrorBody;

use crate::token::TokenError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Outcome kinds of every core operation. Callers only need to tell them
/// apart; the HTTP mapping lives in `into_response`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, invalid, expired, revoked or wrong-role token, or bad login.
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated, but not the owner of the target resource.
    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    ValidationFailed(String),

    #[error(transparent)]
    Io(StoreError),

    #[error("internal error: {0}")]
    ServerFailure(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UnknownUser(_) => Self::NotFound("user"),
            other => Self::Io(other),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Rejected(_) => Self::Unauthorized,
            TokenError::MalformedSubject(_) | TokenError::Encoding(_) => {
                Self::ServerFailure(err.to_string())
            }
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) | Self::ServerFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("Request failed: {}", self);
            "Something went wrong".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
