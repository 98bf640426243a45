//! Secret fixtures for testing
//!
//! Generates secret values shaped like production provisioning: long random
//! signing secrets and encryption secrets sized for a specific
//! content-encryption algorithm.

use rand::{distributions::Alphanumeric, Rng};

/// Byte length of a signing secret as provisioned in production (the exact
/// length is irrelevant to HMAC, which accepts any key size).
pub const SIGNING_SECRET_LEN: usize = 256;

/// Byte length selecting A192CBC-HS384 content encryption.
pub const ENCRYPTION_SECRET_LEN: usize = 48;

/// Random alphanumeric secret of the given byte length.
#[must_use]
pub fn random_secret(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random signing secret sized like production provisioning.
#[must_use]
pub fn random_signing_secret() -> String {
    random_secret(SIGNING_SECRET_LEN)
}

/// Random encryption secret sized for A192CBC-HS384.
#[must_use]
pub fn random_encryption_secret() -> String {
    random_secret(ENCRYPTION_SECRET_LEN)
}
