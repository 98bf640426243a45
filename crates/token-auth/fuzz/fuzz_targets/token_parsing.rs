#![no_main]

use libfuzzer_sys::fuzz_target;
use secrecy::SecretString;
use token_auth::decoder::{parse_signing_algorithm, TokenDecoder, MAX_TOKEN_SIZE_BYTES};
use token_auth::jwe;
use token_auth::secrets::ServiceSecrets;

fuzz_target!(|data: &[u8]| {
    // Try to interpret the fuzz input as a UTF-8 string (token format)
    if let Ok(token) = std::str::from_utf8(data) {
        let secrets = ServiceSecrets::new(SecretString::from("fuzz-signing-secret"))
            .with_encryption(SecretString::from(
                "0123456789abcdef0123456789abcdef0123456789abcdef",
            ));

        // Full pipeline - should never panic, only return typed errors
        let decoder = TokenDecoder::new(300, MAX_TOKEN_SIZE_BYTES, false);
        let _ = decoder.decode_and_verify(token, &secrets);

        // Header parsing and the JWE layer on their own
        let _ = parse_signing_algorithm(token);
        let _ = jwe::decrypt(token, b"0123456789abcdef0123456789abcdef");
    }
});
