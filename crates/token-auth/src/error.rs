//! Authentication error taxonomy.
//!
//! Every failure in the verification pipeline surfaces as a single
//! [`AuthenticationError`] carrying the originating kind. Display messages
//! name the failure and, where relevant, the service identifier; they never
//! include token or secret material.

use thiserror::Error;

/// Failure kinds produced by the token authentication pipeline.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases without a
/// semver-breaking change. Downstream match expressions must include a
/// wildcard arm (`_ =>`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthenticationError {
    /// Target service is not known to the secret registry.
    #[error("Unknown service: {0}")]
    ServiceUnknown(String),

    /// Service is registered but carries no signing secret, so no token
    /// for it can ever be accepted.
    #[error("No signing secret registered for service: {0}")]
    MissingSigningSecret(String),

    /// Ciphertext authenticity check failed, or the encryption key is
    /// wrong, missing, or of unusable length.
    #[error("Token decryption failed")]
    DecryptionFailed,

    /// HMAC signature verification failed.
    #[error("Invalid token signature")]
    SignatureInvalid,

    /// The verified token's expiry claim has passed.
    #[error("Token expired")]
    TokenExpired,

    /// The verified token's not-before claim is in the future.
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Structural failure: oversized token, wrong segment count, bad
    /// base64, or undecodable JSON.
    #[error("Invalid token format: {0}")]
    MalformedToken(String),

    /// Header algorithm outside the accepted list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Verified payload lacks a usable subject, or a registered claim has
    /// the wrong type.
    #[error("Malformed claims: {0}")]
    MalformedClaims(String),
}

impl From<jsonwebtoken::errors::Error> for AuthenticationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => AuthenticationError::SignatureInvalid,
            ErrorKind::ExpiredSignature => AuthenticationError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthenticationError::TokenNotYetValid,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthenticationError::UnsupportedAlgorithm("algorithm not supported".to_string())
            }
            ErrorKind::InvalidToken => {
                AuthenticationError::MalformedToken("invalid JWT structure".to_string())
            }
            ErrorKind::Base64(_) => {
                AuthenticationError::MalformedToken("invalid base64 segment".to_string())
            }
            ErrorKind::Json(_) => {
                AuthenticationError::MalformedToken("invalid JSON payload".to_string())
            }
            ErrorKind::Utf8(_) => {
                AuthenticationError::MalformedToken("payload is not valid UTF-8".to_string())
            }
            _ => AuthenticationError::MalformedToken(format!("token rejected: {err}")),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthenticationError>;
