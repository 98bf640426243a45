//! # Token Auth Test Utilities
//!
//! Shared test utilities for the token authentication core.
//!
//! This crate provides:
//! - Test data builders (`TestTokenBuilder` plus sign/encrypt helpers that
//!   reproduce the production issuer's nested-token construction)
//! - Secret fixtures (random secrets sized like production provisioning)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use token_auth_test_utils::*;
//!
//! let signing = random_signing_secret();
//! let encryption = random_encryption_secret();
//!
//! let claims = TestTokenBuilder::new().for_subject("casuser").build();
//! let token = sign_and_encrypt(&claims, &signing, Algorithm::HS256, &encryption)?;
//! ```

/// Builder patterns for test token construction
pub mod token_builders;

/// Secret fixtures for testing
pub mod secret_fixtures;

pub use secret_fixtures::{
    random_encryption_secret, random_secret, random_signing_secret, ENCRYPTION_SECRET_LEN,
    SIGNING_SECRET_LEN,
};
pub use token_builders::{
    encrypt_token, sign_and_encrypt, sign_token, BuildError, TestTokenBuilder,
};
