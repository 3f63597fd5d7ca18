//! Access grants — the permission scope a token may exercise, packed into a
//! fixed-width bitmask. A grant is a *ceiling*: the token can never do more
//! than its grant allows, regardless of what the owning service account could.

use serde::{Deserialize, Serialize};

/// Ordered permission bits carried by an issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessGrant(pub u64);

impl AccessGrant {
    pub const NONE: AccessGrant = AccessGrant(0);

    pub const SPACE_READ: AccessGrant = AccessGrant(1 << 0);
    pub const SPACE_EDIT: AccessGrant = AccessGrant(1 << 1);
    pub const REPO_READ: AccessGrant = AccessGrant(1 << 2);
    pub const REPO_EDIT: AccessGrant = AccessGrant(1 << 3);
    pub const REPO_PUSH: AccessGrant = AccessGrant(1 << 4);
    pub const REPO_DELETE: AccessGrant = AccessGrant(1 << 5);
    pub const SERVICEACCOUNT_READ: AccessGrant = AccessGrant(1 << 6);
    pub const SERVICEACCOUNT_EDIT: AccessGrant = AccessGrant(1 << 7);

    /// Mask of every defined bit. Anything outside this is reserved.
    pub const KNOWN: AccessGrant = AccessGrant(
        Self::SPACE_READ.0
            | Self::SPACE_EDIT.0
            | Self::REPO_READ.0
            | Self::REPO_EDIT.0
            | Self::REPO_PUSH.0
            | Self::REPO_DELETE.0
            | Self::SERVICEACCOUNT_READ.0
            | Self::SERVICEACCOUNT_EDIT.0,
    );

    /// The reserved full grant, only issuable through privileged flows.
    pub const ALL: AccessGrant = Self::KNOWN;

    /// Read-only access across resource kinds.
    pub const READ_ONLY: AccessGrant = AccessGrant(
        Self::SPACE_READ.0 | Self::REPO_READ.0 | Self::SERVICEACCOUNT_READ.0,
    );

    pub fn contains(&self, other: AccessGrant) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn union(&self, other: AccessGrant) -> AccessGrant {
        AccessGrant(self.0 | other.0)
    }

    /// True when every set bit is a defined permission bit.
    pub fn is_known(&self) -> bool {
        self.0 & !Self::KNOWN.0 == 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Parse a comma-separated list of grant names, e.g. "repo:read,repo:push".
    /// "all" yields the reserved full grant.
    pub fn parse(s: &str) -> Option<AccessGrant> {
        let mut grant = AccessGrant::NONE;
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let bit = match name {
                "all" => Self::ALL,
                "space:read" => Self::SPACE_READ,
                "space:edit" => Self::SPACE_EDIT,
                "repo:read" => Self::REPO_READ,
                "repo:edit" => Self::REPO_EDIT,
                "repo:push" => Self::REPO_PUSH,
                "repo:delete" => Self::REPO_DELETE,
                "serviceaccount:read" => Self::SERVICEACCOUNT_READ,
                "serviceaccount:edit" => Self::SERVICEACCOUNT_EDIT,
                _ => return None,
            };
            grant = grant.union(bit);
        }
        if grant.is_empty() {
            None
        } else {
            Some(grant)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
