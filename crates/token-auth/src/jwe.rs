//! JWE compact serialization with direct symmetric encryption.
//!
//! Implements the `dir` key-management mode with the AES-CBC-HMAC-SHA2
//! content-encryption family (RFC 7518 §5.2): the configured secret is used
//! as the content-encryption key directly, split into a MAC half and an AES
//! half. The HMAC tag covers the protected header (as AAD), the IV and the
//! ciphertext, and is verified in constant time BEFORE any decryption, so
//! tampering is detected independently of the signature layer that the
//! decrypted payload still has to pass.
//!
//! Wire format is the five-segment compact serialization
//! `BASE64URL(header) . encrypted_key . BASE64URL(iv) . BASE64URL(ciphertext)
//! . BASE64URL(tag)` with an empty encrypted-key segment, byte-compatible
//! with RFC 7516 issuers.
//!
//! # Errors
//!
//! Structural problems in the protected header map to
//! [`AuthenticationError::MalformedToken`]; everything from the algorithm
//! check onward (unsupported `alg`/`enc`, key-length mismatch, corrupted
//! segments, tag mismatch, bad padding) maps to
//! [`AuthenticationError::DecryptionFailed`] without distinguishing the
//! cause to the caller. Details go to debug-level logs only.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};
use serde_json::Value;

use crate::error::AuthenticationError;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes192CbcEnc = cbc::Encryptor<aes::Aes192>;
type Aes192CbcDec = cbc::Decryptor<aes::Aes192>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// AES block / IV size in bytes.
const IV_LEN: usize = 16;


/// Supported content-encryption algorithms (RFC 7518 §5.2 family).
///
/// Each variant is keyed by the exact composite-key length: the first half
/// keys the HMAC, the second half keys AES-CBC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncryption {
    /// AES-128-CBC with HMAC-SHA-256; 32-byte key, 16-byte tag.
    A128CbcHs256,
    /// AES-192-CBC with HMAC-SHA-384; 48-byte key, 24-byte tag.
    A192CbcHs384,
    /// AES-256-CBC with HMAC-SHA-512; 64-byte key, 32-byte tag.
    A256CbcHs512,
}

impl ContentEncryption {
    /// The RFC 7518 `enc` header value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ContentEncryption::A128CbcHs256 => "A128CBC-HS256",
            ContentEncryption::A192CbcHs384 => "A192CBC-HS384",
            ContentEncryption::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    /// Parse an `enc` header value.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "A128CBC-HS256" => Some(ContentEncryption::A128CbcHs256),
            "A192CBC-HS384" => Some(ContentEncryption::A192CbcHs384),
            "A256CBC-HS512" => Some(ContentEncryption::A256CbcHs512),
            _ => None,
        }
    }

    /// Select the algorithm whose composite key matches `len` bytes.
    #[must_use]
    pub const fn for_key_len(len: usize) -> Option<Self> {
        match len {
            32 => Some(ContentEncryption::A128CbcHs256),
            48 => Some(ContentEncryption::A192CbcHs384),
            64 => Some(ContentEncryption::A256CbcHs512),
            _ => None,
        }
    }

    /// Composite key length in bytes.
    #[must_use]
    pub const fn key_len(self) -> usize {
        match self {
            ContentEncryption::A128CbcHs256 => 32,
            ContentEncryption::A192CbcHs384 => 48,
            ContentEncryption::A256CbcHs512 => 64,
        }
    }

    /// Truncated authentication tag length in bytes (half the MAC output).
    #[must_use]
    pub const fn tag_len(self) -> usize {
        self.key_len() / 2
    }

    fn mac_algorithm(self) -> ring::hmac::Algorithm {
        match self {
            ContentEncryption::A128CbcHs256 => ring::hmac::HMAC_SHA256,
            ContentEncryption::A192CbcHs384 => ring::hmac::HMAC_SHA384,
            ContentEncryption::A256CbcHs512 => ring::hmac::HMAC_SHA512,
        }
    }
}

/// Encrypt `payload` into a five-segment compact JWE using direct key
/// agreement.
///
/// `content_type` becomes the `cty` header when set (`"JWT"` for nested
/// tokens). The composite key length must match `enc`.
///
/// # Errors
///
/// Returns [`AuthenticationError::DecryptionFailed`] if the key length does
/// not match the declared algorithm or the system RNG fails.
pub fn encrypt(
    payload: &[u8],
    key: &[u8],
    enc: ContentEncryption,
    content_type: Option<&str>,
) -> Result<String, AuthenticationError> {
    if key.len() != enc.key_len() {
        tracing::debug!(
            target: "token_auth.jwe",
            expected = enc.key_len(),
            actual = key.len(),
            "Encryption key length does not match declared algorithm"
        );
        return Err(AuthenticationError::DecryptionFailed);
    }
    let (mac_key, aes_key) = key.split_at(enc.tag_len());

    let mut header = serde_json::Map::new();
    header.insert("alg".to_string(), Value::from("dir"));
    header.insert("enc".to_string(), Value::from(enc.name()));
    if let Some(cty) = content_type {
        header.insert("cty".to_string(), Value::from(cty));
    }
    let header_json =
        serde_json::to_vec(&header).map_err(|_| AuthenticationError::DecryptionFailed)?;
    let header_b64 = URL_SAFE_NO_PAD.encode(header_json);

    let mut iv = [0u8; IV_LEN];
    SystemRandom::new()
        .fill(&mut iv)
        .map_err(|_| AuthenticationError::DecryptionFailed)?;

    let ciphertext = cbc_encrypt(enc, aes_key, &iv, payload)?;
    let tag = compute_tag(enc, mac_key, header_b64.as_bytes(), &iv, &ciphertext)?;

    Ok(format!(
        "{}..{}.{}.{}",
        header_b64,
        URL_SAFE_NO_PAD.encode(iv),
        URL_SAFE_NO_PAD.encode(&ciphertext),
        URL_SAFE_NO_PAD.encode(&tag),
    ))
}

/// Decrypt a five-segment compact JWE with the service's direct key.
///
/// Verifies the authentication tag in constant time before decrypting; a
/// token that fails here never reaches signature verification.
///
/// # Errors
///
/// - [`AuthenticationError::MalformedToken`] for structural header
///   problems (segment count, base64, JSON).
/// - [`AuthenticationError::DecryptionFailed`] for everything
///   crypto-related: non-`dir` key management, unknown or mismatched
///   `enc`, non-empty encrypted-key segment, corrupted IV/ciphertext/tag,
///   tag mismatch, or bad padding.
pub fn decrypt(token: &str, key: &[u8]) -> Result<Vec<u8>, AuthenticationError> {
    let mut segments = token.split('.');
    let header_b64 = segments
        .next()
        .ok_or_else(|| malformed("missing JWE header segment"))?;
    let encrypted_key = segments
        .next()
        .ok_or_else(|| malformed("missing JWE encrypted-key segment"))?;
    let iv_b64 = segments
        .next()
        .ok_or_else(|| malformed("missing JWE IV segment"))?;
    let ciphertext_b64 = segments
        .next()
        .ok_or_else(|| malformed("missing JWE ciphertext segment"))?;
    let tag_b64 = segments
        .next()
        .ok_or_else(|| malformed("missing JWE tag segment"))?;
    if segments.next().is_some() {
        return Err(malformed("JWE must have exactly five segments"));
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| malformed("JWE header is not valid base64url"))?;
    let header: Value = serde_json::from_slice(&header_bytes)
        .map_err(|_| malformed("JWE header is not valid JSON"))?;

    match header.get("alg").and_then(Value::as_str) {
        Some("dir") => {}
        Some(other) => {
            tracing::debug!(
                target: "token_auth.jwe",
                alg = other,
                "Token rejected: unsupported JWE key-management algorithm"
            );
            return Err(AuthenticationError::DecryptionFailed);
        }
        None => return Err(malformed("JWE header missing 'alg'")),
    }

    let enc = header
        .get("enc")
        .and_then(Value::as_str)
        .and_then(ContentEncryption::from_name)
        .ok_or_else(|| {
            tracing::debug!(
                target: "token_auth.jwe",
                "Token rejected: unknown or missing JWE content encryption"
            );
            AuthenticationError::DecryptionFailed
        })?;

    // Direct key agreement carries no wrapped key; a non-empty segment
    // means the token was built for a different key-management mode.
    if !encrypted_key.is_empty() {
        return Err(AuthenticationError::DecryptionFailed);
    }

    if key.len() != enc.key_len() {
        tracing::debug!(
            target: "token_auth.jwe",
            expected = enc.key_len(),
            actual = key.len(),
            "Token rejected: encryption secret length does not match declared algorithm"
        );
        return Err(AuthenticationError::DecryptionFailed);
    }
    let (mac_key, aes_key) = key.split_at(enc.tag_len());

    let iv = URL_SAFE_NO_PAD
        .decode(iv_b64)
        .map_err(|_| AuthenticationError::DecryptionFailed)?;
    let ciphertext = URL_SAFE_NO_PAD
        .decode(ciphertext_b64)
        .map_err(|_| AuthenticationError::DecryptionFailed)?;
    let tag = URL_SAFE_NO_PAD
        .decode(tag_b64)
        .map_err(|_| AuthenticationError::DecryptionFailed)?;

    if iv.len() != IV_LEN {
        return Err(AuthenticationError::DecryptionFailed);
    }

    let expected_tag = compute_tag(enc, mac_key, header_b64.as_bytes(), &iv, &ciphertext)?;
    ring::constant_time::verify_slices_are_equal(&expected_tag, &tag).map_err(|_| {
        tracing::debug!(
            target: "token_auth.jwe",
            "Token rejected: JWE authentication tag mismatch"
        );
        AuthenticationError::DecryptionFailed
    })?;

    cbc_decrypt(enc, aes_key, &iv, &ciphertext)
}

fn malformed(detail: &str) -> AuthenticationError {
    AuthenticationError::MalformedToken(detail.to_string())
}

/// HMAC over AAD || IV || ciphertext || AL, truncated to the tag length
/// (RFC 7518 §5.2.2.1). AL is the AAD bit length as a 64-bit big-endian
/// integer.
fn compute_tag(
    enc: ContentEncryption,
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, AuthenticationError> {
    let aad_bits = u64::try_from(aad.len())
        .map_err(|_| AuthenticationError::DecryptionFailed)?
        .saturating_mul(8);

    let key = ring::hmac::Key::new(enc.mac_algorithm(), mac_key);
    let mut ctx = ring::hmac::Context::with_key(&key);
    ctx.update(aad);
    ctx.update(iv);
    ctx.update(ciphertext);
    ctx.update(&aad_bits.to_be_bytes());
    let mac = ctx.sign();

    mac.as_ref()
        .get(..enc.tag_len())
        .map(<[u8]>::to_vec)
        .ok_or(AuthenticationError::DecryptionFailed)
}

fn cbc_encrypt(
    enc: ContentEncryption,
    aes_key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, AuthenticationError> {
    let ciphertext = match enc {
        ContentEncryption::A128CbcHs256 => Aes128CbcEnc::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        ContentEncryption::A192CbcHs384 => Aes192CbcEnc::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        ContentEncryption::A256CbcHs512 => Aes256CbcEnc::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
    };
    Ok(ciphertext)
}

fn cbc_decrypt(
    enc: ContentEncryption,
    aes_key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, AuthenticationError> {
    match enc {
        ContentEncryption::A128CbcHs256 => Aes128CbcDec::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AuthenticationError::DecryptionFailed),
        ContentEncryption::A192CbcHs384 => Aes192CbcDec::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AuthenticationError::DecryptionFailed),
        ContentEncryption::A256CbcHs512 => Aes256CbcDec::new_from_slices(aes_key, iv)
            .map_err(|_| AuthenticationError::DecryptionFailed)?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| AuthenticationError::DecryptionFailed),
    }
}
