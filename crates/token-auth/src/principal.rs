//! Principal construction from verified claims.

use std::fmt;

use serde_json::{Map, Value};

use crate::claims::{VerifiedClaims, CLAIM_SUBJECT};
use crate::error::AuthenticationError;

/// The authenticated identity produced from a verified token.
///
/// Ownership transfers to the caller as the authentication result; the id
/// and attribute map are complete and immutable at hand-off.
#[derive(Clone, PartialEq)]
pub struct Principal {
    id: String,
    attributes: Map<String, Value>,
}

impl Principal {
    /// The principal identifier (the token's subject).
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Released attributes: every verified claim except the subject,
    /// copied verbatim.
    #[must_use]
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &"[REDACTED]")
            .field("attributes", &self.attributes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Maps verified claims to a [`Principal`].
///
/// Extraction runs strictly after successful verification; no implementation
/// ever sees unverified claims.
pub trait PrincipalExtractor: Send + Sync {
    /// Build a principal from the verified claim set.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::MalformedClaims`] if no usable
    /// identity can be derived.
    fn extract(&self, claims: &VerifiedClaims) -> Result<Principal, AuthenticationError>;
}

/// Default extractor: subject claim becomes the principal id, all other
/// claims are released verbatim as attributes. Attribute-name remapping is
/// policy and belongs to callers, not this layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectPrincipalExtractor;

impl SubjectPrincipalExtractor {
    /// New default extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PrincipalExtractor for SubjectPrincipalExtractor {
    fn extract(&self, claims: &VerifiedClaims) -> Result<Principal, AuthenticationError> {
        let subject = claims
            .subject()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AuthenticationError::MalformedClaims(
                    "subject claim is absent or empty".to_string(),
                )
            })?
            .to_string();

        let attributes: Map<String, Value> = claims
            .as_map()
            .iter()
            .filter(|(name, _)| name.as_str() != CLAIM_SUBJECT)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Principal {
            id: subject,
            attributes,
        })
    }
}
