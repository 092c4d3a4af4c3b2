//! Report signing for the processor→control-plane callbacks.
//!
//! Signature header value: `sha256=<hex HMAC-SHA256(secret, raw body)>`.
//! Verification decodes the hex tag and compares in constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Header carrying the report signature.
pub const SIGNATURE_HEADER: &str = "x-panopub-signature";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Sign a raw payload body, producing the signature header value.
pub fn sign_payload(secret: &[u8], body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(body);
    let tag = mac.finalize().into_bytes();
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(tag))
}

/// Verify a signature header value against a raw payload body.
///
/// Returns false for a missing prefix, malformed hex, wrong tag length, or a
/// tag mismatch. The tag comparison is constant-time.
pub fn verify_payload(secret: &[u8], body: &[u8], header_value: &str) -> bool {
    let Some(hex_tag) = header_value.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(claimed) = hex::decode(hex_tag) else {
        return false;
    };

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts any key size");
    mac.update(body);
    let expected = mac.finalize().into_bytes();

    if claimed.len() != expected.len() {
        return false;
    }
    expected.ct_eq(claimed.as_slice()).into()
}
