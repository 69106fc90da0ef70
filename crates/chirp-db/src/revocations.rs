//! Revocation ledger: token strings invalidated before their natural expiry.
//!
//! Entries are keyed on the raw token string and are never removed.

use chrono::Utc;
use tracing::debug;

use crate::{Database, Result};

impl Database {
    pub fn is_revoked(&self, token: &str) -> Result<bool> {
        self.read(|doc| Ok(doc.revoked_tokens.contains_key(token)))
    }

    /// Record `token` as revoked. Revoking an already revoked token keeps the
    /// original timestamp and does not touch the file.
    pub fn revoke_token(&self, token: &str) -> Result<()> {
        self.transaction_if_changed(|doc| {
            if doc.revoked_tokens.contains_key(token) {
                debug!("Token already revoked");
                return Ok(((), false));
            }
            doc.revoked_tokens.insert(token.to_string(), Utc::now());
            Ok(((), true))
        })
    }
}
