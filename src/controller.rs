//! Issuance pipeline for service-account tokens.
//!
//! Control flow is strictly forward:
//! directory lookup → input validation → authorization gate → minter →
//! response assembly. Validation and authorization run before any state
//! mutation; the duplicate-identifier check lives behind the authorization
//! gate so unauthorized callers cannot probe for existing identifiers.

use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;

use crate::authz::{Authorizer, Permission};
use crate::errors::AppError;
use crate::models::grant::AccessGrant;
use crate::models::principal::Session;
use crate::models::token::{Token, TokenResponse};
use crate::store::{PrincipalDirectory, TokenStore};
use crate::token::jwt::Signer;
use crate::token::minter;
use crate::validate;

/// Policy knobs applied during validation.
#[derive(Debug, Clone, Copy)]
pub struct IssuancePolicy {
    pub max_lifetime: Duration,
    /// Explicit escape hatch for the reserved full grant.
    pub allow_privileged_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateTokenInput {
    pub uid: String,
    pub lifetime_secs: i64,
    pub grants: AccessGrant,
}

pub struct Controller {
    directory: Arc<dyn PrincipalDirectory>,
    authorizer: Arc<dyn Authorizer>,
    token_store: Arc<dyn TokenStore>,
    signer: Arc<dyn Signer>,
    policy: IssuancePolicy,
}

impl Controller {
    pub fn new(
        directory: Arc<dyn PrincipalDirectory>,
        authorizer: Arc<dyn Authorizer>,
        token_store: Arc<dyn TokenStore>,
        signer: Arc<dyn Signer>,
        policy: IssuancePolicy,
    ) -> Self {
        Self {
            directory,
            authorizer,
            token_store,
            signer,
            policy,
        }
    }

    /// Issue a new token for the service account `sa_uid`. The plaintext
    /// credential in the response is emitted exactly once and never stored
    /// in recoverable form.
    pub async fn create_token(
        &self,
        session: &Session,
        sa_uid: &str,
        input: &CreateTokenInput,
    ) -> Result<TokenResponse, AppError> {
        let sa = self.directory.find_service_account(sa_uid).await?;

        // try_seconds: a raw i64 near the extremes does not fit in a Duration.
        let lifetime = Duration::try_seconds(input.lifetime_secs)
            .ok_or_else(|| AppError::InvalidLifetime("lifetime is out of range".into()))?;
        validate::token_uid(&input.uid)?;
        validate::token_lifetime(lifetime, self.policy.max_lifetime)?;
        validate::access_grant(input.grants, self.policy.allow_privileged_default)?;

        // Also confirms the parent scope still exists.
        self.authorizer
            .check(session, &sa.parent, &sa.uid, Permission::ServiceAccountEdit)
            .await?;

        let (token, access_token) = minter::mint(
            self.token_store.as_ref(),
            self.signer.as_ref(),
            session,
            &sa,
            &input.uid,
            lifetime,
            input.grants,
        )
        .await?;

        Ok(TokenResponse {
            token,
            access_token,
        })
    }

    /// List token metadata for a service account. Fingerprints are skipped on
    /// serialization; plaintext credentials are not re-derivable.
    pub async fn list_tokens(
        &self,
        session: &Session,
        sa_uid: &str,
    ) -> Result<Vec<Token>, AppError> {
        let sa = self.directory.find_service_account(sa_uid).await?;
        self.authorizer
            .check(session, &sa.parent, &sa.uid, Permission::ServiceAccountView)
            .await?;
        self.token_store.list(sa.id).await
    }

    /// Revoke a token by identifier. Rotation is revoke + re-issue; records
    /// are never updated in place.
    pub async fn delete_token(
        &self,
        session: &Session,
        sa_uid: &str,
        token_uid: &str,
    ) -> Result<(), AppError> {
        let sa = self.directory.find_service_account(sa_uid).await?;
        validate::token_uid(token_uid)?;
        self.authorizer
            .check(session, &sa.parent, &sa.uid, Permission::ServiceAccountEdit)
            .await?;
        let removed = self.token_store.delete(sa.id, token_uid).await?;
        if !removed {
            return Err(AppError::NotFound("token".into()));
        }
        tracing::info!(token_uid = %token_uid, principal_id = sa.id, "revoked service account token");
        Ok(())
    }
}
