//! End-to-end issuance pipeline tests against in-memory collaborators.
//!
//! Covers:
//! - the happy path (valid input, permitted caller, fresh identifier)
//! - fail-fast validation order (invalid input never reaches the gate or the
//!   store, verified through call counters on the mocks)
//! - authorization strictly before persistence
//! - identifier uniqueness among non-expired tokens
//! - claims/record agreement and the plaintext-once invariant
//! - infrastructure faults (store down, signer broken)
//!
//! Positive AND negative cases are asserted throughout.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use tokenmint::authz::{Authorizer, Permission};
use tokenmint::controller::{Controller, CreateTokenInput, IssuancePolicy};
use tokenmint::errors::AppError;
use tokenmint::models::grant::AccessGrant;
use tokenmint::models::principal::{ParentScope, ScopeType, ServiceAccount, Session};
use tokenmint::models::token::{NewToken, Token};
use tokenmint::store::{PrincipalDirectory, TokenStore};
use tokenmint::token::jwt::{Claims, HsSigner, Signer};
use tokenmint::token::secret;

// ── Mock collaborators ───────────────────────────────────────

struct MockDirectory {
    accounts: Vec<ServiceAccount>,
}

#[async_trait]
impl PrincipalDirectory for MockDirectory {
    async fn find_service_account(&self, uid: &str) -> Result<ServiceAccount, AppError> {
        self.accounts
            .iter()
            .find(|a| a.uid == uid)
            .cloned()
            .ok_or_else(|| AppError::NotFound("service account".into()))
    }
}

struct MockAuthorizer {
    parent_exists: bool,
    allow: bool,
    calls: AtomicUsize,
}

impl MockAuthorizer {
    fn new(parent_exists: bool, allow: bool) -> Self {
        Self {
            parent_exists,
            allow,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Authorizer for MockAuthorizer {
    async fn check(
        &self,
        _session: &Session,
        _parent: &ParentScope,
        _account_uid: &str,
        _permission: Permission,
    ) -> Result<(), AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.parent_exists {
            return Err(AppError::NotFound("parent scope".into()));
        }
        if !self.allow {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

/// In-memory token store enforcing the uniqueness invariant under a single
/// lock, the way the real store relies on its unique index.
struct MemStore {
    tokens: Mutex<Vec<Token>>,
    insert_calls: AtomicUsize,
}

impl MemStore {
    fn new() -> Self {
        Self {
            tokens: Mutex::new(Vec::new()),
            insert_calls: AtomicUsize::new(0),
        }
    }

    fn seed(&self, token: Token) {
        self.tokens.lock().unwrap().push(token);
    }

    fn snapshot(&self) -> Vec<Token> {
        self.tokens.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenStore for MemStore {
    async fn insert(&self, token: NewToken) -> Result<Token, AppError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let mut tokens = self.tokens.lock().unwrap();
        let now = Utc::now();
        let duplicate = tokens.iter().any(|t| {
            t.principal_id == token.principal_id && t.uid == token.uid && t.expires_at > now
        });
        if duplicate {
            return Err(AppError::DuplicateIdentifier);
        }
        tokens.retain(|t| {
            !(t.principal_id == token.principal_id && t.uid == token.uid && t.expires_at <= now)
        });
        let stored = Token {
            id: tokens.len() as i64 + 1,
            uid: token.uid,
            principal_id: token.principal_id,
            issued_by: token.issued_by,
            grants: token.grants,
            fingerprint: token.fingerprint,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            created_at: now,
        };
        tokens.push(stored.clone());
        Ok(stored)
    }

    async fn list(&self, principal_id: i64) -> Result<Vec<Token>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.principal_id == principal_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, principal_id: i64, uid: &str) -> Result<bool, AppError> {
        let mut tokens = self.tokens.lock().unwrap();
        let before = tokens.len();
        tokens.retain(|t| !(t.principal_id == principal_id && t.uid == uid));
        Ok(tokens.len() < before)
    }

    async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<Token>, AppError> {
        Ok(self
            .tokens
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.fingerprint == fingerprint)
            .cloned())
    }
}

struct FailingStore;

#[async_trait]
impl TokenStore for FailingStore {
    async fn insert(&self, _token: NewToken) -> Result<Token, AppError> {
        Err(AppError::StorageUnavailable("connection refused".into()))
    }
    async fn list(&self, _principal_id: i64) -> Result<Vec<Token>, AppError> {
        Err(AppError::StorageUnavailable("connection refused".into()))
    }
    async fn delete(&self, _principal_id: i64, _uid: &str) -> Result<bool, AppError> {
        Err(AppError::StorageUnavailable("connection refused".into()))
    }
    async fn find_by_fingerprint(&self, _fingerprint: &str) -> Result<Option<Token>, AppError> {
        Err(AppError::StorageUnavailable("connection refused".into()))
    }
}

struct FailingSigner;

impl Signer for FailingSigner {
    fn sign(&self, _claims: &Claims) -> Result<String, AppError> {
        Err(AppError::SigningError("key unavailable".into()))
    }
}

// ── Fixture ──────────────────────────────────────────────────

const SA_UID: &str = "sa-deploy";
const SA_ID: i64 = 42;

fn service_account() -> ServiceAccount {
    ServiceAccount {
        id: SA_ID,
        uid: SA_UID.into(),
        display_name: "Deploy bot".into(),
        parent: ParentScope {
            scope_type: ScopeType::Repository,
            id: 7,
        },
        created_at: Utc::now(),
    }
}

fn session() -> Session {
    Session {
        principal_id: 9,
        principal_uid: "ops-user".into(),
    }
}

fn policy() -> IssuancePolicy {
    IssuancePolicy {
        max_lifetime: Duration::days(90),
        allow_privileged_default: false,
    }
}

struct Fixture {
    controller: Controller,
    authorizer: Arc<MockAuthorizer>,
    store: Arc<MemStore>,
    signer: Arc<HsSigner>,
}

fn fixture_with(authorizer: MockAuthorizer, policy: IssuancePolicy) -> Fixture {
    let authorizer = Arc::new(authorizer);
    let store = Arc::new(MemStore::new());
    let signer = Arc::new(HsSigner::new("integration-test-key"));
    let controller = Controller::new(
        Arc::new(MockDirectory {
            accounts: vec![service_account()],
        }),
        authorizer.clone(),
        store.clone(),
        signer.clone(),
        policy,
    );
    Fixture {
        controller,
        authorizer,
        store,
        signer,
    }
}

fn fixture() -> Fixture {
    fixture_with(MockAuthorizer::new(true, true), policy())
}

fn input(uid: &str, lifetime_secs: i64, grants: AccessGrant) -> CreateTokenInput {
    CreateTokenInput {
        uid: uid.into(),
        lifetime_secs,
        grants,
    }
}

fn expired_token(uid: &str) -> Token {
    let past: DateTime<Utc> = Utc::now() - Duration::hours(2);
    Token {
        id: 1,
        uid: uid.into(),
        principal_id: SA_ID,
        issued_by: 9,
        grants: AccessGrant::READ_ONLY,
        fingerprint: secret::fingerprint("old-secret"),
        issued_at: past,
        expires_at: past + Duration::hours(1),
        created_at: past,
    }
}

// ── Happy path ───────────────────────────────────────────────

#[tokio::test]
async fn issue_succeeds_for_valid_input() {
    let f = fixture();
    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 24 * 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap();

    assert!(!response.access_token.is_empty());
    assert_eq!(response.token.uid, "ci-bot");
    assert_eq!(response.token.principal_id, SA_ID);
    assert_eq!(response.token.issued_by, 9);
    assert_eq!(response.token.grants, AccessGrant::READ_ONLY);

    // Expiry ≈ now + 24h.
    let expected = Utc::now() + Duration::hours(24);
    let drift = (response.token.expires_at - expected).num_seconds().abs();
    assert!(drift < 5, "expiry drifted {}s from now+24h", drift);

    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 1);
    assert_eq!(f.authorizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn credential_claims_match_persisted_record() {
    let f = fixture();
    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::REPO_PUSH))
        .await
        .unwrap();

    let claims = f.signer.decode(&response.access_token).unwrap();
    let stored = &f.store.snapshot()[0];

    assert_eq!(claims.sub, SA_UID);
    assert_eq!(claims.tkn, stored.uid);
    assert_eq!(claims.grant, stored.grants);
    assert_eq!(claims.iat, stored.issued_at.timestamp());
    assert_eq!(claims.exp, stored.expires_at.timestamp());

    // The stored fingerprint is the one-way image of the credential's secret.
    assert!(secret::verify(&claims.jti, &stored.fingerprint));
    assert_ne!(claims.jti, stored.fingerprint);
}

#[tokio::test]
async fn plaintext_never_appears_in_serialized_metadata() {
    let f = fixture();
    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap();

    let metadata = serde_json::to_value(&response.token).unwrap();
    assert!(metadata.get("fingerprint").is_none());
    let rendered = metadata.to_string();
    assert!(!rendered.contains(&response.access_token));
}

// ── Uniqueness ───────────────────────────────────────────────

#[tokio::test]
async fn second_issuance_with_same_identifier_conflicts() {
    let f = fixture();
    let req = input("ci-bot", 24 * 3600, AccessGrant::READ_ONLY);
    f.controller.create_token(&session(), SA_UID, &req).await.unwrap();

    let err = f.controller.create_token(&session(), SA_UID, &req).await.unwrap_err();
    assert!(matches!(err, AppError::DuplicateIdentifier));
    assert_eq!(f.store.snapshot().len(), 1);
}

#[tokio::test]
async fn expired_token_frees_its_identifier() {
    let f = fixture();
    f.store.seed(expired_token("ci-bot"));

    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap();
    assert_eq!(response.token.uid, "ci-bot");

    // Only the fresh record remains.
    let tokens = f.store.snapshot();
    assert_eq!(tokens.len(), 1);
    assert!(tokens[0].expires_at > Utc::now());
}

#[tokio::test]
async fn concurrent_issuance_yields_one_success_one_conflict() {
    let f = Arc::new(fixture());
    let req = || input("ci-bot", 3600, AccessGrant::READ_ONLY);

    let a = {
        let f = f.clone();
        let req = req();
        tokio::spawn(async move { f.controller.create_token(&session(), SA_UID, &req).await })
    };
    let b = {
        let f = f.clone();
        let req = req();
        tokio::spawn(async move { f.controller.create_token(&session(), SA_UID, &req).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::DuplicateIdentifier)))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(f.store.snapshot().len(), 1);
}

// ── Validation ordering ──────────────────────────────────────

#[tokio::test]
async fn negative_lifetime_rejected_before_any_side_effect() {
    let f = fixture();
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", -1, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidLifetime(_)));
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.authorizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn extreme_lifetime_values_rejected_without_panicking() {
    let f = fixture();
    for secs in [i64::MAX, i64::MIN, i64::MAX / 1000 + 1] {
        let err = f
            .controller
            .create_token(&session(), SA_UID, &input("ci-bot", secs, AccessGrant::READ_ONLY))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidLifetime(_)), "secs {}", secs);
    }
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.authorizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn lifetime_above_policy_ceiling_rejected() {
    let f = fixture();
    let over = (Duration::days(90) + Duration::seconds(1)).num_seconds();
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", over, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidLifetime(_)));
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_identifier_never_reaches_the_gate() {
    let f = fixture();
    for bad in ["", "1starts-with-digit", "has space", "-dash"] {
        let err = f
            .controller
            .create_token(&session(), SA_UID, &input(bad, 3600, AccessGrant::READ_ONLY))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIdentifier(_)), "uid {:?}", bad);
    }
    assert_eq!(f.authorizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn undefined_grant_bits_rejected() {
    let f = fixture();
    let bad = AccessGrant(AccessGrant::REPO_READ.0 | (1 << 33));
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, bad))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidGrant(_)));
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn full_grant_needs_the_privileged_flag() {
    let f = fixture();
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::ALL))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidGrant(_)));

    let mut privileged = policy();
    privileged.allow_privileged_default = true;
    let f = fixture_with(MockAuthorizer::new(true, true), privileged);
    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::ALL))
        .await
        .unwrap();
    assert_eq!(response.token.grants, AccessGrant::ALL);
}

// ── Authorization gate ───────────────────────────────────────

#[tokio::test]
async fn caller_without_edit_permission_is_forbidden() {
    let f = fixture_with(MockAuthorizer::new(true, false), policy());
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 24 * 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    // Denied callers never touch the store, so identifier existence can't leak.
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_parent_scope_is_not_found() {
    let f = fixture_with(MockAuthorizer::new(false, true), policy());
    let err = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(f.store.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_service_account_is_not_found() {
    let f = fixture();
    let err = f
        .controller
        .create_token(&session(), "no-such-account", &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(f.authorizer.calls.load(Ordering::SeqCst), 0);
}

// ── Infrastructure faults ────────────────────────────────────

#[tokio::test]
async fn store_outage_surfaces_storage_unavailable() {
    let signer = Arc::new(HsSigner::new("integration-test-key"));
    let controller = Controller::new(
        Arc::new(MockDirectory {
            accounts: vec![service_account()],
        }),
        Arc::new(MockAuthorizer::new(true, true)),
        Arc::new(FailingStore),
        signer,
        policy(),
    );
    let err = controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StorageUnavailable(_)));
}

#[tokio::test]
async fn signer_failure_surfaces_signing_error() {
    let store = Arc::new(MemStore::new());
    let controller = Controller::new(
        Arc::new(MockDirectory {
            accounts: vec![service_account()],
        }),
        Arc::new(MockAuthorizer::new(true, true)),
        store.clone(),
        Arc::new(FailingSigner),
        policy(),
    );
    let err = controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::SigningError(_)));
    // The durable record exists but no credential was ever issued for it.
    assert_eq!(store.snapshot().len(), 1);
}

// ── Supplemental operations ──────────────────────────────────

#[tokio::test]
async fn list_and_revoke_round_trip() {
    let f = fixture();
    f.controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap();
    f.controller
        .create_token(&session(), SA_UID, &input("release-bot", 3600, AccessGrant::REPO_PUSH))
        .await
        .unwrap();

    let tokens = f.controller.list_tokens(&session(), SA_UID).await.unwrap();
    assert_eq!(tokens.len(), 2);

    f.controller
        .delete_token(&session(), SA_UID, "ci-bot")
        .await
        .unwrap();
    let tokens = f.controller.list_tokens(&session(), SA_UID).await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].uid, "release-bot");

    let err = f
        .controller
        .delete_token(&session(), SA_UID, "ci-bot")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn revoked_credential_no_longer_resolves_by_fingerprint() {
    let f = fixture();
    let response = f
        .controller
        .create_token(&session(), SA_UID, &input("ci-bot", 3600, AccessGrant::READ_ONLY))
        .await
        .unwrap();

    let claims = f.signer.decode(&response.access_token).unwrap();
    let fp = secret::fingerprint(&claims.jti);
    assert!(f.store.find_by_fingerprint(&fp).await.unwrap().is_some());

    f.controller
        .delete_token(&session(), SA_UID, "ci-bot")
        .await
        .unwrap();
    assert!(f.store.find_by_fingerprint(&fp).await.unwrap().is_none());
}
