//! Authorization gate. Runs strictly after input validation and strictly
//! before any state mutation, so an unauthorized caller learns nothing from a
//! partially completed issuance (in particular, not whether a token identifier
//! is already taken).

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::principal::{ParentScope, Session};

/// Permissions the gate can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ServiceAccountView,
    ServiceAccountEdit,
}

/// Membership roles on a parent scope.
/// Matches the `role` column in the `memberships` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "editor" => Some(Role::Editor),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }

    /// Check if this role carries the required permission.
    pub fn has_permission(&self, required: Permission) -> bool {
        match required {
            Permission::ServiceAccountView => true, // all roles can view
            Permission::ServiceAccountEdit => matches!(self, Role::Admin | Role::Editor),
        }
    }
}

/// Resolves whether a session holds a permission on a service account's
/// parent scope. `NotFound` means the parent scope itself is gone;
/// `Forbidden` means the scope exists but the session may not act on it.
/// An implementation is free to collapse the former into the latter where
/// existence must not leak.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn check(
        &self,
        session: &Session,
        parent: &ParentScope,
        account_uid: &str,
        permission: Permission,
    ) -> Result<(), AppError>;
}

/// Authorizer that allows everything. Used by the operator CLI, which
/// already holds the database credentials; never wired into the HTTP path.
pub struct SystemAuthorizer;

#[async_trait]
impl Authorizer for SystemAuthorizer {
    async fn check(
        &self,
        _session: &Session,
        _parent: &ParentScope,
        _account_uid: &str,
        _permission: Permission,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────
