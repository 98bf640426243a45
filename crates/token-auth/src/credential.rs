//! Token credential presented at the authentication boundary.

use std::fmt;

/// A raw token bound to the service the caller claims to authenticate to.
///
/// Constructed once by the caller and consumed by
/// [`TokenAuthenticationHandler::authenticate`]; never persisted.
///
/// The raw token is redacted in Debug output so credentials cannot leak
/// through logs.
///
/// [`TokenAuthenticationHandler::authenticate`]: crate::handler::TokenAuthenticationHandler::authenticate
#[derive(Clone)]
pub struct TokenCredential {
    token: String,
    service_id: String,
}

impl TokenCredential {
    /// Create a credential for `token` targeting `service_id`.
    pub fn new(token: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            service_id: service_id.into(),
        }
    }

    /// The raw compact-serialized token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Identifier of the relying party this token is scoped to.
    #[must_use]
    pub fn service_id(&self) -> &str {
        &self.service_id
    }
}

impl fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredential")
            .field("token", &"[REDACTED]")
            .field("service_id", &self.service_id)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let credential = TokenCredential::new("eyJ.abc.def", "https://app.example.org");
        assert_eq!(credential.token(), "eyJ.abc.def");
        assert_eq!(credential.service_id(), "https://app.example.org");
    }

    #[test]
    fn test_debug_redacts_token() {
        let credential = TokenCredential::new("eyJ.super-secret-token.sig", "svc-1");
        let debug_str = format!("{credential:?}");

        assert!(!debug_str.contains("super-secret-token"));
        assert!(debug_str.contains("[REDACTED]"));
        assert!(debug_str.contains("svc-1"), "service id stays visible");
    }
}
