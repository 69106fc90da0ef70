//! Credential codec: HS256 JWTs carrying a user id and a role tag.
//!
//! Lifetimes are fixed per role so that no caller can mint a long-lived
//! access token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use chirp_types::api::{Claims, TokenRole};
use chirp_types::models::UserId;

/// Access tokens live one hour.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;
/// Refresh tokens live 60 days.
pub const REFRESH_TOKEN_TTL_SECS: i64 = 60 * 24 * 60 * 60;

pub fn ttl(role: TokenRole) -> Duration {
    match role {
        TokenRole::Access => Duration::seconds(ACCESS_TOKEN_TTL_SECS),
        TokenRole::Refresh => Duration::seconds(REFRESH_TOKEN_TTL_SECS),
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature or format, expired, or issued for another role.
    #[error("token rejected: {0}")]
    Rejected(String),

    /// Signature checked out but `sub` is not a user id.
    #[error("token subject is not a user id: {0:?}")]
    MalformedSubject(String),

    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, subject: UserId, role: TokenRole) -> Result<String, TokenError> {
        self.issue_at(subject, role, Utc::now())
    }

    /// Issue a token as if minted at `issued_at`. Expiry is still the role's
    /// fixed lifetime from that instant.
    pub fn issue_at(
        &self,
        subject: UserId,
        role: TokenRole,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            iss: role.issuer().to_string(),
            sub: subject.to_string(),
            jti: format!("{:016x}", rand::random::<u64>()),
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl(role)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encoding)
    }

    /// Check signature, expiry and role, and return the subject id.
    pub fn verify(&self, token: &str, expected: TokenRole) -> Result<UserId, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[expected.issuer()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| TokenError::Rejected(e.to_string()))?;

        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| TokenError::MalformedSubject(data.claims.sub))
    }
}
