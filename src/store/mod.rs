//! Collaborator contracts around the issuance core. The core consumes these
//! as trait objects; production wiring binds them to Postgres, tests bind
//! them to in-memory mocks.

pub mod postgres;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::principal::ServiceAccount;
use crate::models::token::{NewToken, Token};

/// Lookup of service accounts by uid. Owned elsewhere; read-only here.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_service_account(&self, uid: &str) -> Result<ServiceAccount, AppError>;
}

/// Durable token records. `insert` must enforce the per-principal identifier
/// uniqueness invariant atomically: of two concurrent inserts with the same
/// (principal, uid), exactly one succeeds and the other sees
/// `DuplicateIdentifier`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: NewToken) -> Result<Token, AppError>;

    async fn list(&self, principal_id: i64) -> Result<Vec<Token>, AppError>;

    /// Returns true when a record was removed.
    async fn delete(&self, principal_id: i64, uid: &str) -> Result<bool, AppError>;

    /// Revocation/verification lookup by stored secret fingerprint.
    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Token>, AppError>;
}
