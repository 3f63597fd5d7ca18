use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::grant::AccessGrant;

/// Persisted token record. The plaintext secret never appears here; only its
/// one-way fingerprint is stored, and even that is skipped on serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub id: i64,
    /// Caller-chosen identifier, unique per owning principal among
    /// non-expired tokens.
    pub uid: String,
    /// Owning service account.
    pub principal_id: i64,
    /// Session principal that created the token.
    pub issued_by: i64,
    pub grants: AccessGrant,
    #[serde(skip_serializing, default)]
    pub fingerprint: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// What the minter hands the store: everything but the store-assigned row id.
#[derive(Debug, Clone)]
pub struct NewToken {
    pub uid: String,
    pub principal_id: i64,
    pub issued_by: i64,
    pub grants: AccessGrant,
    pub fingerprint: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issuance result: persisted metadata plus the one-time plaintext bearer
/// credential. The credential exists only in this response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: Token,
    pub access_token: String,
}
