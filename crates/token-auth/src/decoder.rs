//! Token decode-and-verify pipeline.
//!
//! Order is fixed: size guard, layer detection, decryption (encrypted
//! tokens only), signature verification, then time-claim validation. A
//! failure at any stage stops the pipeline; in particular the signature is
//! never checked on data that failed decryption, and claims are never
//! inspected before the signature holds.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (resource-exhaustion guard)
//! - Only HMAC algorithms are accepted for the signature layer; `none` and
//!   asymmetric algorithms are rejected up front
//! - Rejection details go to debug-level logs, never into error payloads

use std::collections::HashSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};

use crate::claims::{validate_time_claims, VerifiedClaims};
use crate::error::AuthenticationError;
use crate::jwe;
use crate::secrets::ServiceSecrets;

/// Maximum allowed token size in bytes (8 KiB).
///
/// Typical tokens are well under 1 KiB; anything larger is rejected before
/// base64 decoding or cryptographic work.
pub const MAX_TOKEN_SIZE_BYTES: usize = 8192;

/// Signature algorithms accepted for the signing layer.
///
/// Secrets are provisioned per service as shared symmetric values, so only
/// the HMAC family is meaningful here. Accepting an asymmetric algorithm
/// against a symmetric secret would invite key-confusion attacks, so the
/// list is closed.
pub const ACCEPTED_SIGNING_ALGORITHMS: &[&str] = &["HS256", "HS384", "HS512"];

/// Algorithms rejected unconditionally.
///
/// `none` means no signature at all and is trivially forgeable.
pub const FORBIDDEN_SIGNING_ALGORITHMS: &[&str] = &["none"];

/// Segment counts of the two accepted compact serializations.
const JWS_SEGMENTS: usize = 3;
const JWE_SEGMENTS: usize = 5;

/// Decoder for signed and encrypted-then-signed tokens.
#[derive(Debug, Clone)]
pub struct TokenDecoder {
    clock_skew_secs: u64,
    max_token_size: usize,
    require_encryption: bool,
}

impl TokenDecoder {
    /// Build a decoder.
    ///
    /// `clock_skew_secs` is the tolerance applied to the time claims.
    /// `require_encryption` rejects plain signed tokens for services that
    /// have an encryption secret registered.
    #[must_use]
    pub fn new(clock_skew_secs: u64, max_token_size: usize, require_encryption: bool) -> Self {
        Self {
            clock_skew_secs,
            max_token_size,
            require_encryption,
        }
    }

    /// Decrypt (when applicable) and verify `token` against `secrets`,
    /// producing the verified claim set.
    ///
    /// # Errors
    ///
    /// - [`AuthenticationError::MalformedToken`] for oversized input, an
    ///   unrecognized segment count, or a decrypted payload that is not a
    ///   signed token.
    /// - [`AuthenticationError::DecryptionFailed`] for any failure of the
    ///   encryption layer, including an encrypted token arriving for a
    ///   service with no encryption secret.
    /// - [`AuthenticationError::UnsupportedAlgorithm`],
    ///   [`AuthenticationError::SignatureInvalid`],
    ///   [`AuthenticationError::TokenExpired`],
    ///   [`AuthenticationError::TokenNotYetValid`] and
    ///   [`AuthenticationError::MalformedClaims`] from the later stages.
    pub fn decode_and_verify(
        &self,
        token: &str,
        secrets: &ServiceSecrets,
    ) -> Result<VerifiedClaims, AuthenticationError> {
        if token.len() > self.max_token_size {
            tracing::debug!(
                target: "token_auth.decoder",
                token_size = token.len(),
                max_size = self.max_token_size,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AuthenticationError::MalformedToken(
                "token exceeds maximum allowed size".to_string(),
            ));
        }

        match token.split('.').count() {
            JWS_SEGMENTS => {
                if self.require_encryption && secrets.encryption().is_some() {
                    tracing::debug!(
                        target: "token_auth.decoder",
                        "Token rejected: plain signed token for a service that requires encryption"
                    );
                    return Err(AuthenticationError::DecryptionFailed);
                }
                self.verify_signed(token, secrets)
            }
            JWE_SEGMENTS => {
                let key = secrets.encryption().ok_or_else(|| {
                    tracing::debug!(
                        target: "token_auth.decoder",
                        "Token rejected: encrypted token but no encryption secret registered"
                    );
                    AuthenticationError::DecryptionFailed
                })?;

                let plaintext = jwe::decrypt(token, key.expose_secret().as_bytes())?;
                let inner = String::from_utf8(plaintext).map_err(|_| {
                    AuthenticationError::MalformedToken(
                        "decrypted payload is not valid UTF-8".to_string(),
                    )
                })?;
                if inner.split('.').count() != JWS_SEGMENTS {
                    return Err(AuthenticationError::MalformedToken(
                        "decrypted payload is not a signed token".to_string(),
                    ));
                }
                self.verify_signed(&inner, secrets)
            }
            segments => {
                tracing::debug!(
                    target: "token_auth.decoder",
                    segments,
                    "Token rejected: unrecognized compact serialization"
                );
                Err(AuthenticationError::MalformedToken(
                    "token must have 3 or 5 dot-separated segments".to_string(),
                ))
            }
        }
    }

    /// Verify a compact JWS and validate its time claims.
    fn verify_signed(
        &self,
        token: &str,
        secrets: &ServiceSecrets,
    ) -> Result<VerifiedClaims, AuthenticationError> {
        let algorithm = parse_signing_algorithm(token)?;

        let mut validation = Validation::new(algorithm);
        // Time claims are validated after verification with the configured
        // clock-skew tolerance; the library defaults would check exp here
        // with different leeway and a mandatory-exp rule the wire format
        // does not promise.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let decoding_key = DecodingKey::from_secret(secrets.signing().expose_secret().as_bytes());
        let token_data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &decoding_key, &validation)?;

        let claims = VerifiedClaims::from_map(token_data.claims);
        validate_time_claims(&claims, self.clock_skew_secs)?;
        Ok(claims)
    }
}

/// Extract and validate the signing algorithm from a compact JWS header.
///
/// # Errors
///
/// - [`AuthenticationError::MalformedToken`] if the header segment is not
///   base64url-encoded JSON or lacks a string `alg`.
/// - [`AuthenticationError::UnsupportedAlgorithm`] if the algorithm is not
///   in [`ACCEPTED_SIGNING_ALGORITHMS`].
pub fn parse_signing_algorithm(token: &str) -> Result<Algorithm, AuthenticationError> {
    let header_part = token
        .split('.')
        .next()
        .ok_or_else(|| AuthenticationError::MalformedToken("empty token".to_string()))?;

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|_| {
        AuthenticationError::MalformedToken("token header is not valid base64url".to_string())
    })?;
    let header: Value = serde_json::from_slice(&header_bytes).map_err(|_| {
        AuthenticationError::MalformedToken("token header is not valid JSON".to_string())
    })?;

    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .ok_or_else(|| AuthenticationError::MalformedToken("token header missing 'alg'".to_string()))?;

    if FORBIDDEN_SIGNING_ALGORITHMS.contains(&alg) {
        tracing::debug!(
            target: "token_auth.decoder",
            alg,
            "Token rejected: forbidden signing algorithm"
        );
        return Err(AuthenticationError::UnsupportedAlgorithm(format!(
            "algorithm '{alg}' is not allowed"
        )));
    }

    match alg {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => {
            tracing::debug!(
                target: "token_auth.decoder",
                alg = other,
                "Token rejected: signing algorithm not in accepted list"
            );
            Err(AuthenticationError::UnsupportedAlgorithm(format!(
                "algorithm '{other}' is not in the accepted list"
            )))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use jsonwebtoken::EncodingKey;
    use secrecy::SecretString;
    use serde_json::json;

    const SIGNING_SECRET: &str = "unit-test-signing-secret-0123456789";

    fn sign(claims: &Value, secret: &str, algorithm: Algorithm) -> String {
        let header = jsonwebtoken::Header::new(algorithm);
        jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes()))
            .unwrap()
    }

    fn signing_only() -> ServiceSecrets {
        ServiceSecrets::new(SecretString::from(SIGNING_SECRET))
    }

    fn with_encryption(key: &str) -> ServiceSecrets {
        signing_only().with_encryption(SecretString::from(key))
    }

    fn decoder() -> TokenDecoder {
        TokenDecoder::new(0, MAX_TOKEN_SIZE_BYTES, false)
    }

    fn future_exp() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    /// 48 bytes: selects A192CBC-HS384, as the production issuer uses.
    const ENCRYPTION_SECRET: &str = "0123456789abcdef0123456789abcdef0123456789abcdef";

    fn encrypt_nested(signed: &str, key: &str) -> String {
        let enc = jwe::ContentEncryption::for_key_len(key.len()).unwrap();
        jwe::encrypt(signed.as_bytes(), key.as_bytes(), enc, Some("JWT")).unwrap()
    }

    #[test]
    fn test_signed_token_round_trip() {
        let claims = json!({"sub": "casuser", "exp": future_exp(), "role": "staff"});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);

        let verified = decoder().decode_and_verify(&token, &signing_only()).unwrap();
        assert_eq!(verified.subject(), Some("casuser"));
        assert_eq!(verified.get("role"), Some(&json!("staff")));
    }

    #[test]
    fn test_hs384_and_hs512_accepted() {
        for algorithm in [Algorithm::HS384, Algorithm::HS512] {
            let claims = json!({"sub": "casuser", "exp": future_exp()});
            let token = sign(&claims, SIGNING_SECRET, algorithm);
            assert!(decoder().decode_and_verify(&token, &signing_only()).is_ok());
        }
    }

    #[test]
    fn test_wrong_signing_secret_rejected() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let token = sign(&claims, "a-completely-different-secret", Algorithm::HS256);

        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);

        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let mut sig = URL_SAFE_NO_PAD.decode(&parts[2]).unwrap();
        sig[0] ^= 0x01;
        parts[2] = URL_SAFE_NO_PAD.encode(&sig);
        let tampered = parts.join(".");

        assert!(matches!(
            decoder().decode_and_verify(&tampered, &signing_only()),
            Err(AuthenticationError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = json!({"sub": "casuser", "exp": chrono::Utc::now().timestamp() - 3600});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);

        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_without_exp_accepted() {
        let claims = json!({"sub": "casuser"});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);
        assert!(decoder().decode_and_verify(&token, &signing_only()).is_ok());
    }

    #[test]
    fn test_alg_none_rejected() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"casuser"}"#);
        let token = format!("{header}.{payload}.");

        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_asymmetric_alg_rejected() {
        for alg in ["EdDSA", "RS256", "ES256"] {
            let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"{alg}"}}"#).as_bytes());
            let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"casuser"}"#);
            let token = format!("{header}.{payload}.c2ln");

            assert!(
                matches!(
                    decoder().decode_and_verify(&token, &signing_only()),
                    Err(AuthenticationError::UnsupportedAlgorithm(_))
                ),
                "algorithm {alg} must be rejected"
            );
        }
    }

    #[test]
    fn test_oversized_token_rejected() {
        let token = "a".repeat(MAX_TOKEN_SIZE_BYTES + 1);
        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_unrecognized_segment_counts_rejected() {
        for token in ["", "single", "two.parts", "a.b.c.d", "a.b.c.d.e.f"] {
            assert!(
                matches!(
                    decoder().decode_and_verify(token, &signing_only()),
                    Err(AuthenticationError::MalformedToken(_))
                ),
                "token {token:?} must be malformed"
            );
        }
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(matches!(
            decoder().decode_and_verify("!!!.payload.sig", &signing_only()),
            Err(AuthenticationError::MalformedToken(_))
        ));

        let header = URL_SAFE_NO_PAD.encode(b"not json");
        let token = format!("{header}.payload.sig");
        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_encrypted_token_round_trip() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let signed = sign(&claims, SIGNING_SECRET, Algorithm::HS256);
        let token = encrypt_nested(&signed, ENCRYPTION_SECRET);

        let secrets = with_encryption(ENCRYPTION_SECRET);
        let verified = decoder().decode_and_verify(&token, &secrets).unwrap();
        assert_eq!(verified.subject(), Some("casuser"));
    }

    #[test]
    fn test_encrypted_token_without_encryption_secret() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let signed = sign(&claims, SIGNING_SECRET, Algorithm::HS256);
        let token = encrypt_nested(&signed, ENCRYPTION_SECRET);

        assert!(matches!(
            decoder().decode_and_verify(&token, &signing_only()),
            Err(AuthenticationError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_encrypted_token_with_wrong_encryption_secret() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let signed = sign(&claims, SIGNING_SECRET, Algorithm::HS256);
        let token = encrypt_nested(&signed, ENCRYPTION_SECRET);

        let secrets = with_encryption("ffffffffffffffffffffffffffffffffffffffffffffffff");
        assert!(matches!(
            decoder().decode_and_verify(&token, &secrets),
            Err(AuthenticationError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_decrypted_payload_must_be_signed_token() {
        let token = encrypt_nested("not a nested token", ENCRYPTION_SECRET);
        let secrets = with_encryption(ENCRYPTION_SECRET);

        assert!(matches!(
            decoder().decode_and_verify(&token, &secrets),
            Err(AuthenticationError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_require_encryption_rejects_plain_token() {
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);

        let strict = TokenDecoder::new(0, MAX_TOKEN_SIZE_BYTES, true);
        let secrets = with_encryption(ENCRYPTION_SECRET);
        assert!(matches!(
            strict.decode_and_verify(&token, &secrets),
            Err(AuthenticationError::DecryptionFailed)
        ));

        // Without an encryption secret there is nothing to require.
        assert!(strict.decode_and_verify(&token, &signing_only()).is_ok());
    }

    #[test]
    fn test_plain_token_accepted_when_encryption_optional() {
        // Signing mandatory, encryption optional: a plain signed token
        // verifies even for a service that also holds an encryption secret.
        let claims = json!({"sub": "casuser", "exp": future_exp()});
        let token = sign(&claims, SIGNING_SECRET, Algorithm::HS256);

        let secrets = with_encryption(ENCRYPTION_SECRET);
        assert!(decoder().decode_and_verify(&token, &secrets).is_ok());
    }

    #[test]
    fn test_fuzz_regressions_never_panic() {
        // Known-bad inputs from adversarial corpora must yield typed
        // errors, never panics.
        let inputs = [
            "",
            ".",
            "..",
            "...",
            "....",
            "not-a-jwt",
            "!!!.!!!.!!!",
            "eyJhbGciOiJIUzI1NiJ9\n.eyJzdWIiOiJ4In0\n.",
            "a]]]].b.c",
            "\u{202E}evil.\u{FEFF}.\u{0000}",
        ];
        let secrets = with_encryption(ENCRYPTION_SECRET);
        for input in inputs {
            assert!(
                decoder().decode_and_verify(input, &secrets).is_err(),
                "input {input:?} must be rejected"
            );
        }
    }
}
