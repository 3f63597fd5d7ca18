use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of resource a service account hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    Space,
    Repository,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Space => "space",
            ScopeType::Repository => "repository",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "space" => Some(ScopeType::Space),
            "repository" => Some(ScopeType::Repository),
            _ => None,
        }
    }
}

/// The resource a service account belongs to. The issuance core only ever
/// uses this to ask the authorizer a question; it never reads the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentScope {
    #[serde(rename = "type")]
    pub scope_type: ScopeType,
    pub id: i64,
}

/// A non-human principal owned by a parent scope. Owned by the principal
/// directory; this core reads it, never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub id: i64,
    pub uid: String,
    pub display_name: String,
    pub parent: ParentScope,
    pub created_at: DateTime<Utc>,
}

/// The calling identity, produced at the transport boundary.
#[derive(Debug, Clone)]
pub struct Session {
    pub principal_id: i64,
    pub principal_uid: String,
}
