//! Verified claim sets and registered-claim validation.
//!
//! A [`VerifiedClaims`] value only ever exists downstream of successful
//! signature verification; it lives for the duration of one authentication
//! call and is never cached across calls.

use serde_json::{Map, Value};
use std::fmt;

use crate::error::AuthenticationError;

/// Subject registered claim name (RFC 7519 §4.1.2).
pub const CLAIM_SUBJECT: &str = "sub";
/// Expiration time registered claim name (RFC 7519 §4.1.4).
pub const CLAIM_EXPIRY: &str = "exp";
/// Not-before registered claim name (RFC 7519 §4.1.5).
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Issued-at registered claim name (RFC 7519 §4.1.6).
pub const CLAIM_ISSUED_AT: &str = "iat";

/// Claim set produced by a successful decode-and-verify.
///
/// The subject value is redacted in Debug output; claim names stay visible.
#[derive(Clone, PartialEq)]
pub struct VerifiedClaims {
    claims: Map<String, Value>,
}

impl VerifiedClaims {
    /// Wrap a verified payload's claim map.
    #[must_use]
    pub fn from_map(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// The subject claim, when present as a string.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.claims.get(CLAIM_SUBJECT).and_then(Value::as_str)
    }

    /// Look up a claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    /// The full claim map.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Number of claims.
    #[must_use]
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// Whether the claim set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Read an epoch-seconds claim, when present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthenticationError::MalformedClaims`] if the claim exists
    /// but is not an integral number.
    pub fn epoch_seconds(&self, name: &str) -> Result<Option<i64>, AuthenticationError> {
        match self.claims.get(name) {
            None => Ok(None),
            Some(value) => value.as_i64().map(Some).ok_or_else(|| {
                AuthenticationError::MalformedClaims(format!(
                    "claim '{name}' is not an epoch-seconds number"
                ))
            }),
        }
    }
}

impl fmt::Debug for VerifiedClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.claims {
            if name == CLAIM_SUBJECT {
                map.entry(name, &"[REDACTED]");
            } else {
                map.entry(name, value);
            }
        }
        map.finish()
    }
}

/// Validate the registered time claims of a verified token.
///
/// Runs strictly after signature verification. All three time claims are
/// optional; a claim that is absent simply skips its check.
///
/// # Errors
///
/// - [`AuthenticationError::TokenExpired`] if `exp` has passed (beyond the
///   clock-skew tolerance).
/// - [`AuthenticationError::TokenNotYetValid`] if `nbf` is in the future.
/// - [`AuthenticationError::MalformedToken`] if `iat` is further in the
///   future than the clock-skew tolerance allows.
/// - [`AuthenticationError::MalformedClaims`] if a time claim is present
///   but not an integral number.
pub fn validate_time_claims(
    claims: &VerifiedClaims,
    clock_skew_secs: u64,
) -> Result<(), AuthenticationError> {
    let now = chrono::Utc::now().timestamp();
    validate_time_claims_at(claims, clock_skew_secs, now)
}

/// Deterministic time-claim validation against an explicit `now`.
///
/// Prefer [`validate_time_claims`] in production code. This variant exists
/// so boundary conditions can be unit-tested without wall-clock dependence.
pub(crate) fn validate_time_claims_at(
    claims: &VerifiedClaims,
    clock_skew_secs: u64,
    now: i64,
) -> Result<(), AuthenticationError> {
    let skew = i64::try_from(clock_skew_secs).unwrap_or(i64::MAX);

    if let Some(exp) = claims.epoch_seconds(CLAIM_EXPIRY)? {
        if now >= exp.saturating_add(skew) {
            tracing::debug!(
                target: "token_auth.claims",
                exp,
                now,
                clock_skew_secs,
                "Token rejected: expiry claim has passed"
            );
            return Err(AuthenticationError::TokenExpired);
        }
    }

    if let Some(nbf) = claims.epoch_seconds(CLAIM_NOT_BEFORE)? {
        if nbf > now.saturating_add(skew) {
            tracing::debug!(
                target: "token_auth.claims",
                nbf,
                now,
                "Token rejected: not-before claim in the future"
            );
            return Err(AuthenticationError::TokenNotYetValid);
        }
    }

    if let Some(iat) = claims.epoch_seconds(CLAIM_ISSUED_AT)? {
        if iat > now.saturating_add(skew) {
            tracing::debug!(
                target: "token_auth.claims",
                iat,
                now,
                "Token rejected: issued-at claim too far in the future"
            );
            return Err(AuthenticationError::MalformedToken(
                "iat claim is in the future".to_string(),
            ));
        }
    }

    Ok(())
}
