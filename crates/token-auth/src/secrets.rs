//! Per-service secret resolution.
//!
//! Each relying party carries its own signing secret and, optionally, an
//! encryption secret. Secrets are scoped strictly per service: there is no
//! global default to fall back to, so a misconfigured service can never be
//! satisfied by another tenant's key material.
//!
//! Secret values are held as [`SecretString`] so Debug output and derived
//! logging can never expose them.

use std::collections::HashMap;
use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};

use crate::error::AuthenticationError;

/// Usable token secrets for one service.
///
/// Invariant: a value of this type always carries a signing secret. The
/// registry-side record ([`ServiceTokenProperties`]) allows the signing
/// secret to be absent; [`SecretResolver::resolve`] refuses to produce a
/// `ServiceSecrets` from such a record.
#[derive(Debug, Clone)]
pub struct ServiceSecrets {
    signing: SecretString,
    encryption: Option<SecretString>,
}

impl ServiceSecrets {
    /// Secrets for a service that issues signed-only tokens.
    #[must_use]
    pub fn new(signing: SecretString) -> Self {
        Self {
            signing,
            encryption: None,
        }
    }

    /// Attach an encryption secret for encrypted-then-signed tokens.
    #[must_use]
    pub fn with_encryption(mut self, encryption: SecretString) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// The HMAC signing secret.
    #[must_use]
    pub fn signing(&self) -> &SecretString {
        &self.signing
    }

    /// The direct-encryption secret, if the service uses encrypted tokens.
    #[must_use]
    pub fn encryption(&self) -> Option<&SecretString> {
        self.encryption.as_ref()
    }
}

/// Raw per-service token properties as stored in a registry.
///
/// Mirrors the two well-known properties a service registry exposes per
/// service: a signing secret value and an optional encryption secret value.
/// Either may be absent or empty in storage; resolution decides usability.
#[derive(Debug, Clone, Default)]
pub struct ServiceTokenProperties {
    signing: Option<SecretString>,
    encryption: Option<SecretString>,
}

impl ServiceTokenProperties {
    /// Empty property set (service known, token auth unusable).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signing secret property.
    #[must_use]
    pub fn signing_secret(mut self, value: SecretString) -> Self {
        self.signing = Some(value);
        self
    }

    /// Set the encryption secret property.
    #[must_use]
    pub fn encryption_secret(mut self, value: SecretString) -> Self {
        self.encryption = Some(value);
        self
    }

    fn into_secrets(self, service_id: &str) -> Result<ServiceSecrets, AuthenticationError> {
        let signing = self
            .signing
            .filter(|s| !s.expose_secret().is_empty())
            .ok_or_else(|| AuthenticationError::MissingSigningSecret(service_id.to_string()))?;

        let encryption = self.encryption.filter(|s| !s.expose_secret().is_empty());

        let mut secrets = ServiceSecrets::new(signing);
        if let Some(encryption) = encryption {
            secrets = secrets.with_encryption(encryption);
        }
        Ok(secrets)
    }
}

/// Capability interface for per-service secret lookup.
///
/// Implementations read the service's configured properties at call time so
/// secret rotation takes effect on the next request. Implementations backed
/// by remote storage own their timeout discipline and surface lookup
/// failures as [`AuthenticationError::ServiceUnknown`] rather than hanging
/// the caller.
pub trait SecretResolver: Send + Sync {
    /// Resolve the registered secrets for `service_id`.
    ///
    /// # Errors
    ///
    /// - [`AuthenticationError::ServiceUnknown`] if the service is not
    ///   registered.
    /// - [`AuthenticationError::MissingSigningSecret`] if the service
    ///   exists but has no usable signing secret.
    fn resolve(&self, service_id: &str) -> Result<ServiceSecrets, AuthenticationError>;
}

/// In-memory registry of per-service token properties.
///
/// Reads take a shared lock per call and copy out a transient snapshot, so
/// concurrent `resolve` calls need no external synchronization and a
/// `register` for an existing service is visible on the next call.
#[derive(Debug, Default)]
pub struct InMemorySecretRegistry {
    services: RwLock<HashMap<String, ServiceTokenProperties>>,
}

impl InMemorySecretRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the token properties for a service.
    pub fn register(&self, service_id: impl Into<String>, properties: ServiceTokenProperties) {
        let mut services = match self.services.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        services.insert(service_id.into(), properties);
    }

    /// Remove a service. Returns `true` if it was registered.
    pub fn remove(&self, service_id: &str) -> bool {
        let mut services = match self.services.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        services.remove(service_id).is_some()
    }
}

impl SecretResolver for InMemorySecretRegistry {
    fn resolve(&self, service_id: &str) -> Result<ServiceSecrets, AuthenticationError> {
        let properties = {
            let services = match self.services.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            services.get(service_id).cloned()
        };

        properties
            .ok_or_else(|| AuthenticationError::ServiceUnknown(service_id.to_string()))?
            .into_secrets(service_id)
    }
}
