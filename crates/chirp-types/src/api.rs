use serde::{Deserialize, Serialize};

use crate::models::{UserId, UserView};

// -- JWT Claims --

/// Issuer tag of access tokens.
pub const ACCESS_ISSUER: &str = "chirp-access";
/// Issuer tag of refresh tokens.
pub const REFRESH_ISSUER: &str = "chirp-refresh";

/// Which kind of bearer token a caller holds or expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRole {
    Access,
    Refresh,
}

impl TokenRole {
    /// The `iss` claim carried by tokens of this role.
    pub fn issuer(self) -> &'static str {
        match self {
            Self::Access => ACCESS_ISSUER,
            Self::Refresh => REFRESH_ISSUER,
        }
    }
}

/// JWT claims shared by the codec and anything that inspects tokens.
/// `sub` is the user id as a decimal string. `jti` is a random nonce so that
/// two tokens minted in the same second are still distinct strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

// -- Users & sessions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: UserId,
    pub email: String,
    pub is_privileged: bool,
    pub token: String,
    pub refresh_token: String,
}

impl LoginResponse {
    pub fn new(user: UserView, token: String, refresh_token: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_privileged: user.is_privileged,
            token,
            refresh_token,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub body: String,
}

/// Sort order for post listings, by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub sort: SortOrder,
}

// -- Webhooks --

pub const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    pub user_id: Option<UserId>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
