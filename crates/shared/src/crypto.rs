//! Cryptographic utilities: content hashing and HMAC signing.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Signs a payload with HMAC-SHA256, returning a `"sha256={hex}"` signature
/// string in the same format PSPs commonly use for webhook signing.
pub fn hmac_sign(payload: &str, secret: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| e.to_string())?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    Ok(format!("sha256={signature}"))
}

/// Verifies a `"sha256={hex}"` HMAC-SHA256 signature against a payload and
/// shared secret, in constant time.
pub fn hmac_verify(payload: &str, secret: &str, signature: &str) -> bool {
    let Some(expected_hex) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected_bytes) = hex::decode(expected_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_hmac_sign_and_verify_roundtrip() {
        let payload = r#"{"event":"payment.completed","id":"abc"}"#;
        let secret = "whsec_test_secret";
        let signature = hmac_sign(payload, secret).unwrap();
        assert!(signature.starts_with("sha256="));
        assert!(hmac_verify(payload, secret, &signature));
    }

    #[test]
    fn test_hmac_verify_rejects_wrong_secret() {
        let payload = "payload";
        let signature = hmac_sign(payload, "secret-a").unwrap();
        assert!(!hmac_verify(payload, "secret-b", &signature));
    }

    #[test]
    fn test_hmac_verify_rejects_malformed_signature() {
        assert!(!hmac_verify("payload", "secret", "not-a-signature"));
        assert!(!hmac_verify("payload", "secret", "sha256=not-hex"));
    }

    #[test]
    fn test_hmac_verify_rejects_tampered_payload() {
        let signature = hmac_sign("original", "secret").unwrap();
        assert!(!hmac_verify("tampered", "secret", &signature));
    }
}
