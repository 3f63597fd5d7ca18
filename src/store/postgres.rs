//! Postgres-backed collaborators. The tokens table carries a unique index on
//! (principal_id, uid); expired rows for the same key are cleared inside the
//! insert transaction, so identifier reuse after expiry works while two
//! concurrent inserts still resolve to one success and one conflict.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::authz::{Authorizer, Permission, Role};
use crate::errors::AppError;
use crate::models::grant::AccessGrant;
use crate::models::principal::{ParentScope, ScopeType, ServiceAccount, Session};
use crate::models::token::{NewToken, Token};
use crate::store::{PrincipalDirectory, TokenStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: i64,
    uid: String,
    principal_id: i64,
    issued_by: i64,
    grants: i64,
    fingerprint: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for Token {
    fn from(r: TokenRow) -> Self {
        Token {
            id: r.id,
            uid: r.uid,
            principal_id: r.principal_id,
            issued_by: r.issued_by,
            grants: AccessGrant(r.grants as u64),
            fingerprint: r.fingerprint,
            issued_at: r.issued_at,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

const TOKEN_COLUMNS: &str =
    "id, uid, principal_id, issued_by, grants, fingerprint, issued_at, expires_at, created_at";

#[async_trait]
impl TokenStore for PgStore {
    async fn insert(&self, token: NewToken) -> Result<Token, AppError> {
        let mut tx = self.pool.begin().await?;

        // Identifier uniqueness only applies to non-expired tokens.
        sqlx::query(
            "DELETE FROM tokens WHERE principal_id = $1 AND uid = $2 AND expires_at <= NOW()",
        )
        .bind(token.principal_id)
        .bind(&token.uid)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, TokenRow>(&format!(
            r#"INSERT INTO tokens (uid, principal_id, issued_by, grants, fingerprint, issued_at, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            TOKEN_COLUMNS
        ))
        .bind(&token.uid)
        .bind(token.principal_id)
        .bind(token.issued_by)
        .bind(token.grants.0 as i64)
        .bind(&token.fingerprint)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn list(&self, principal_id: i64) -> Result<Vec<Token>, AppError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {} FROM tokens WHERE principal_id = $1 ORDER BY created_at DESC",
            TOKEN_COLUMNS
        ))
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Token::from).collect())
    }

    async fn delete(&self, principal_id: i64, uid: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE principal_id = $1 AND uid = $2")
            .bind(principal_id)
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Token>, AppError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {} FROM tokens WHERE fingerprint = $1",
            TOKEN_COLUMNS
        ))
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Token::from))
    }
}

#[async_trait]
impl PrincipalDirectory for PgStore {
    async fn find_service_account(&self, uid: &str) -> Result<ServiceAccount, AppError> {
        let row = sqlx::query(
            "SELECT id, uid, display_name, parent_type, parent_id, created_at
             FROM service_accounts WHERE uid = $1",
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("service account".into()))?;

        let parent_type: String = row.get("parent_type");
        let scope_type = ScopeType::from_str(&parent_type).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown parent_type '{}'", parent_type))
        })?;

        Ok(ServiceAccount {
            id: row.get("id"),
            uid: row.get("uid"),
            display_name: row.get("display_name"),
            parent: ParentScope {
                scope_type,
                id: row.get("parent_id"),
            },
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl Authorizer for PgStore {
    async fn check(
        &self,
        session: &Session,
        parent: &ParentScope,
        account_uid: &str,
        permission: Permission,
    ) -> Result<(), AppError> {
        let scope_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM scopes WHERE scope_type = $1 AND scope_id = $2)",
        )
        .bind(parent.scope_type.as_str())
        .bind(parent.id)
        .fetch_one(&self.pool)
        .await?;
        if !scope_exists {
            return Err(AppError::NotFound("parent scope".into()));
        }

        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM memberships
             WHERE principal_id = $1 AND scope_type = $2 AND scope_id = $3",
        )
        .bind(session.principal_id)
        .bind(parent.scope_type.as_str())
        .bind(parent.id)
        .fetch_optional(&self.pool)
        .await?;

        let allowed = role
            .and_then(|r| Role::from_str(&r))
            .map(|r| r.has_permission(permission))
            .unwrap_or(false);

        if !allowed {
            tracing::warn!(
                principal_id = session.principal_id,
                scope_type = parent.scope_type.as_str(),
                scope_id = parent.id,
                account_uid = %account_uid,
                required = ?permission,
                "authorization denied"
            );
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}
