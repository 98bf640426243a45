//! # Token Authentication Core
//!
//! Validates caller-supplied security tokens (signed and optionally
//! encrypted JWTs) against per-service secrets and produces an
//! authenticated principal on success.
//!
//! This crate provides:
//! - **Secret resolution**: per-service signing/encryption secrets behind
//!   the [`SecretResolver`] seam, with an in-memory registry
//! - **Token decoding**: JWE direct-encryption decryption (AES-CBC-HMAC)
//!   followed by HMAC signature verification and time-claim validation
//! - **Principal extraction**: subject plus verbatim claim attributes
//! - **Handler orchestration**: the all-or-nothing `authenticate` contract
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use secrecy::SecretString;
//! use token_auth::{
//!     HandlerConfig, InMemorySecretRegistry, ServiceTokenProperties,
//!     SubjectPrincipalExtractor, TokenAuthenticationHandler, TokenCredential,
//! };
//!
//! let registry = InMemorySecretRegistry::new();
//! registry.register(
//!     "https://app.example.org",
//!     ServiceTokenProperties::new()
//!         .signing_secret(SecretString::from("per-service-signing-secret")),
//! );
//!
//! let handler = TokenAuthenticationHandler::new(
//!     Arc::new(registry),
//!     Arc::new(SubjectPrincipalExtractor::new()),
//!     HandlerConfig::default(),
//! );
//!
//! let credential = TokenCredential::new("eyJ...", "https://app.example.org");
//! // A garbage token yields a typed failure, never a panic.
//! assert!(handler.authenticate(&credential).is_err());
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]

/// Verified claim sets and time-claim validation.
pub mod claims;

/// Token credential presented at the authentication boundary.
pub mod credential;

/// Decode-and-verify pipeline.
pub mod decoder;

/// Authentication error taxonomy.
pub mod error;

/// Token authentication handler and configuration.
pub mod handler;

/// JWE direct encryption (compact serialization).
pub mod jwe;

/// Principal construction from verified claims.
pub mod principal;

/// Per-service secret resolution.
pub mod secrets;

pub use claims::VerifiedClaims;
pub use credential::TokenCredential;
pub use decoder::{TokenDecoder, ACCEPTED_SIGNING_ALGORITHMS, MAX_TOKEN_SIZE_BYTES};
pub use error::{AuthenticationError, Result};
pub use handler::{
    AuthenticationResult, HandlerConfig, TokenAuthenticationHandler, DEFAULT_CLOCK_SKEW_SECS,
    MAX_CLOCK_SKEW_SECS,
};
pub use jwe::ContentEncryption;
pub use principal::{Principal, PrincipalExtractor, SubjectPrincipalExtractor};
pub use secrets::{
    InMemorySecretRegistry, SecretResolver, ServiceSecrets, ServiceTokenProperties,
};
