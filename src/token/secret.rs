//! Secret material for issued tokens: a fixed-entropy random secret and its
//! one-way fingerprint. Only the fingerprint is ever persisted.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// 32 bytes of entropy, well above the 128-bit floor.
const SECRET_LEN: usize = 32;

/// Generate a fresh hex-encoded random secret.
pub fn generate() -> String {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One-way fingerprint of a secret, suitable for storage and revocation
/// lookups. The secret itself is not recoverable from this value.
pub fn fingerprint(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time check of a presented secret against a stored fingerprint.
pub fn verify(secret: &str, stored_fingerprint: &str) -> bool {
    fingerprint(secret)
        .as_bytes()
        .ct_eq(stored_fingerprint.as_bytes())
        .into()
}

// ── Tests ────────────────────────────────────────────────────
