//! Builder patterns for test token construction
//!
//! Provides fluent APIs for creating test claims and compact tokens,
//! mirroring what a production issuer emits: a signed JWS, optionally
//! wrapped in a direct-encryption JWE (nested token).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{Map, Value};
use thiserror::Error;

use token_auth::jwe::{self, ContentEncryption};

/// Token construction error type
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_subject("casuser")
///     .with_claim("role", "staff")
///     .expires_in(3600)
///     .build();
/// let token = sign_token(&claims, "signing-secret", Algorithm::HS256)?;
/// ```
pub struct TestTokenBuilder {
    sub: Option<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new claims builder with defaults
    #[must_use]
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: Some("test-subject".to_string()),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: Some(now.timestamp()),
            extra: Map::new(),
        }
    }

    /// Set the subject
    #[must_use]
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = Some(subject.to_string());
        self
    }

    /// Drop the subject claim entirely
    #[must_use]
    pub fn without_subject(mut self) -> Self {
        self.sub = None;
        self
    }

    /// Set expiration relative to now (negative values produce an
    /// already-expired token)
    #[must_use]
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Drop the expiry claim entirely
    #[must_use]
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set issued-at timestamp
    #[must_use]
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Add an arbitrary claim
    #[must_use]
    pub fn with_claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// Build the claims as a JSON value
    #[must_use]
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(sub) = self.sub {
            claims.insert("sub".to_string(), Value::from(sub));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), Value::from(exp));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), Value::from(iat));
        }
        for (name, value) in self.extra {
            claims.insert(name, value);
        }
        Value::Object(claims)
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Sign claims into a compact JWS with an HMAC secret.
///
/// # Errors
///
/// Returns `BuildError::Signing` if encoding fails.
pub fn sign_token(
    claims: &Value,
    signing_secret: &str,
    algorithm: Algorithm,
) -> Result<String, BuildError> {
    let header = Header::new(algorithm);
    jsonwebtoken::encode(
        &header,
        claims,
        &EncodingKey::from_secret(signing_secret.as_bytes()),
    )
    .map_err(|e| BuildError::Signing(e.to_string()))
}

/// Wrap a signed token in a direct-encryption JWE (nested token).
///
/// The content encryption is selected by the secret's byte length
/// (32 → A128CBC-HS256, 48 → A192CBC-HS384, 64 → A256CBC-HS512), the same
/// rule a `dir`-mode issuer applies.
///
/// # Errors
///
/// Returns `BuildError::Encryption` if the secret length matches no
/// supported algorithm or encryption fails.
pub fn encrypt_token(signed: &str, encryption_secret: &str) -> Result<String, BuildError> {
    let enc = ContentEncryption::for_key_len(encryption_secret.len()).ok_or_else(|| {
        BuildError::Encryption(format!(
            "no content encryption for a {}-byte secret",
            encryption_secret.len()
        ))
    })?;

    jwe::encrypt(
        signed.as_bytes(),
        encryption_secret.as_bytes(),
        enc,
        Some("JWT"),
    )
    .map_err(|e| BuildError::Encryption(e.to_string()))
}

/// Sign then encrypt in one step, the way the production issuer builds
/// encrypted-then-signed tokens.
///
/// # Errors
///
/// Propagates `sign_token` and `encrypt_token` failures.
pub fn sign_and_encrypt(
    claims: &Value,
    signing_secret: &str,
    algorithm: Algorithm,
    encryption_secret: &str,
) -> Result<String, BuildError> {
    let signed = sign_token(claims, signing_secret, algorithm)?;
    encrypt_token(&signed, encryption_secret)
}
