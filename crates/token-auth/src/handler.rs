//! Token authentication handler.
//!
//! Orchestrates secret resolution, token decoding and principal extraction
//! behind the single `authenticate` operation. The handler is stateless
//! across calls aside from its injected collaborators; each call either
//! completes with an [`AuthenticationResult`] or a typed failure, with no
//! partial state and no retries.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::credential::TokenCredential;
use crate::decoder::{TokenDecoder, MAX_TOKEN_SIZE_BYTES};
use crate::error::AuthenticationError;
use crate::principal::{Principal, PrincipalExtractor};
use crate::secrets::SecretResolver;

/// Default clock skew tolerance for time claims (5 minutes).
pub const DEFAULT_CLOCK_SKEW_SECS: u64 = 300;

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Caps misconfiguration that would otherwise widen the acceptance window
/// for expired tokens.
pub const MAX_CLOCK_SKEW_SECS: u64 = 600;

/// Default handler name reported on authentication results.
pub const DEFAULT_HANDLER_NAME: &str = "token-authentication-handler";

/// Handler configuration.
///
/// All fields have serde defaults so a partial configuration source can
/// bind only what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Name carried on authentication results.
    pub handler_name: String,
    /// Clock skew tolerance in seconds, clamped to [`MAX_CLOCK_SKEW_SECS`].
    pub clock_skew_secs: u64,
    /// Maximum accepted token size in bytes.
    pub max_token_size: usize,
    /// When true, plain signed tokens are rejected for services that have
    /// an encryption secret registered.
    pub require_encryption: bool,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            handler_name: DEFAULT_HANDLER_NAME.to_string(),
            clock_skew_secs: DEFAULT_CLOCK_SKEW_SECS,
            max_token_size: MAX_TOKEN_SIZE_BYTES,
            require_encryption: false,
        }
    }
}

/// Successful authentication outcome: the extracted principal plus the
/// identity of the handler that produced it.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    handler_name: String,
    principal: Principal,
}

impl AuthenticationResult {
    /// Name of the handler that authenticated the credential.
    #[must_use]
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    /// The authenticated principal.
    #[must_use]
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Consume the result, keeping only the principal.
    #[must_use]
    pub fn into_principal(self) -> Principal {
        self.principal
    }
}

/// Authentication handler for signed (and optionally encrypted) tokens
/// scoped to a target service.
pub struct TokenAuthenticationHandler {
    name: String,
    resolver: Arc<dyn SecretResolver>,
    extractor: Arc<dyn PrincipalExtractor>,
    decoder: TokenDecoder,
}

impl TokenAuthenticationHandler {
    /// Build a handler from its collaborators and configuration.
    ///
    /// A clock skew above [`MAX_CLOCK_SKEW_SECS`] is clamped and logged.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn SecretResolver>,
        extractor: Arc<dyn PrincipalExtractor>,
        config: HandlerConfig,
    ) -> Self {
        let clock_skew_secs = if config.clock_skew_secs > MAX_CLOCK_SKEW_SECS {
            tracing::warn!(
                target: "token_auth.handler",
                configured = config.clock_skew_secs,
                max = MAX_CLOCK_SKEW_SECS,
                "Clock skew tolerance clamped to maximum"
            );
            MAX_CLOCK_SKEW_SECS
        } else {
            config.clock_skew_secs
        };

        Self {
            name: config.handler_name,
            resolver,
            extractor,
            decoder: TokenDecoder::new(
                clock_skew_secs,
                config.max_token_size,
                config.require_encryption,
            ),
        }
    }

    /// The handler's configured name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Authenticate a token credential against its target service.
    ///
    /// Resolution, decoding and extraction run in strict order; the first
    /// failure is returned as-is. Failure logs carry only the failure kind
    /// and the service identifier, never token or secret material.
    ///
    /// # Errors
    ///
    /// Any [`AuthenticationError`] from the pipeline stages; see the error
    /// type for the full taxonomy.
    #[instrument(skip_all, fields(service = %credential.service_id()))]
    pub fn authenticate(
        &self,
        credential: &TokenCredential,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        let result = self.run_pipeline(credential);
        if let Err(ref error) = result {
            tracing::warn!(
                target: "token_auth.handler",
                service = credential.service_id(),
                error = %error,
                "Authentication failed"
            );
        }
        result
    }

    fn run_pipeline(
        &self,
        credential: &TokenCredential,
    ) -> Result<AuthenticationResult, AuthenticationError> {
        let secrets = self.resolver.resolve(credential.service_id())?;
        tracing::debug!(
            target: "token_auth.handler",
            encrypted = secrets.encryption().is_some(),
            "Service secrets resolved"
        );

        let claims = self.decoder.decode_and_verify(credential.token(), &secrets)?;
        tracing::debug!(
            target: "token_auth.handler",
            claim_count = claims.len(),
            "Token verified"
        );

        let principal = self.extractor.extract(&claims)?;
        tracing::debug!(target: "token_auth.handler", "Principal extracted");

        Ok(AuthenticationResult {
            handler_name: self.name.clone(),
            principal,
        })
    }
}

impl fmt::Debug for TokenAuthenticationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAuthenticationHandler")
            .field("name", &self.name)
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}
