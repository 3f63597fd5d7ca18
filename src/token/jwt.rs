//! Bearer credential claims and signing.
//!
//! The credential is a signed, self-contained assertion of principal
//! identity, token identifier, grant scope and expiry. The signing key is an
//! injected capability (`Signer`), never ambient global state, so the minter
//! stays testable in isolation and key rotation can swap the implementation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::grant::AccessGrant;

/// Claim set carried by an issued bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Owning principal (service account) uid.
    pub sub: String,
    /// Token identifier, for record lookup on verification/revocation.
    pub tkn: String,
    /// Grant bitmask snapshot at issuance time.
    pub grant: AccessGrant,
    /// Hex secret whose SHA-256 matches the stored fingerprint.
    pub jti: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Claim set for interactive caller sessions, produced and consumed only at
/// the transport boundary. Session management proper lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Calling principal uid.
    pub sub: String,
    /// Calling principal row id.
    pub pid: i64,
    pub exp: i64,
}

/// Signing capability for bearer credentials.
pub trait Signer: Send + Sync {
    fn sign(&self, claims: &Claims) -> Result<String, AppError>;
}

/// HS256 signer over a system-wide symmetric key.
pub struct HsSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl HsSigner {
    pub fn new(key: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
        }
    }

    /// Validate signature and expiry of a presented credential and return its
    /// claims. Used at the transport boundary and by revocation lookups.
    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Unauthenticated)?;
        Ok(data.claims)
    }

    pub fn sign_session(&self, claims: &SessionClaims) -> Result<String, AppError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::SigningError(e.to_string()))
    }

    pub fn decode_session(&self, token: &str) -> Result<SessionClaims, AppError> {
        let data = jsonwebtoken::decode::<SessionClaims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::Unauthenticated)?;
        Ok(data.claims)
    }
}

impl Signer for HsSigner {
    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::SigningError(e.to_string()))
    }
}

// ── Tests ────────────────────────────────────────────────────
