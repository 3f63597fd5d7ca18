//! The minting step: random secret, expiry computation, the single durable
//! write, and credential signing.
//!
//! Order matters: the record is persisted before the credential is signed, so
//! a credential can never exist without a matching durable record. A signing
//! failure after the write leaves an inert record behind; it never issued.

use chrono::{Duration, Utc};
use zeroize::Zeroize;

use crate::errors::AppError;
use crate::models::grant::AccessGrant;
use crate::models::principal::{ServiceAccount, Session};
use crate::models::token::{NewToken, Token};
use crate::store::TokenStore;
use crate::token::jwt::{Claims, Signer};
use crate::token::secret;

/// Mint a service-account token: one store write, one signed credential.
/// Inputs are assumed validated and authorized by the caller.
pub async fn mint(
    store: &dyn TokenStore,
    signer: &dyn Signer,
    issuer: &Session,
    account: &ServiceAccount,
    uid: &str,
    lifetime: Duration,
    grants: AccessGrant,
) -> Result<(Token, String), AppError> {
    let mut plaintext = secret::generate();
    let issued_at = Utc::now();
    let expires_at = issued_at + lifetime;

    let token = store
        .insert(NewToken {
            uid: uid.to_string(),
            principal_id: account.id,
            issued_by: issuer.principal_id,
            grants,
            fingerprint: secret::fingerprint(&plaintext),
            issued_at,
            expires_at,
        })
        .await?;

    // Claims mirror the persisted record, not the request.
    let claims = Claims {
        sub: account.uid.clone(),
        tkn: token.uid.clone(),
        grant: token.grants,
        jti: plaintext.clone(),
        iat: token.issued_at.timestamp(),
        exp: token.expires_at.timestamp(),
    };
    let signed = signer.sign(&claims);
    plaintext.zeroize();
    let access_token = signed?;

    tracing::info!(
        token_uid = %token.uid,
        principal_id = token.principal_id,
        issued_by = token.issued_by,
        expires_at = %token.expires_at,
        "issued service account token"
    );

    Ok((token, access_token))
}
