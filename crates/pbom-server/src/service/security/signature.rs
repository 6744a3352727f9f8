//! HMAC-SHA256 webhook signature verification.

use std::fmt;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of the `X-Hub-Signature-256` header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Reasons a delivery signature is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("webhook secret is not configured")]
    EmptySecret,
    #[error("signature header is missing")]
    MissingHeader,
    #[error("signature header is not of the form sha256=<hex>")]
    MalformedHeader,
    #[error("signature is not valid hex")]
    InvalidHex,
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies `X-Hub-Signature-256` headers against a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<str>,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    fn mac(&self) -> Result<HmacSha256, SignatureError> {
        if self.secret.is_empty() {
            return Err(SignatureError::EmptySecret);
        }

        HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| SignatureError::EmptySecret)
    }

    /// Computes the header value GitHub would send for `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<String, SignatureError> {
        let mut mac = self.mac()?;
        mac.update(payload);
        let digest = hex::encode(mac.finalize().into_bytes());
        Ok(format!("{SIGNATURE_PREFIX}{digest}"))
    }

    /// Checks `header` against the HMAC of `payload`.
    ///
    /// The digest comparison runs in constant time.
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        let mut mac = self.mac()?;

        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::MissingHeader)?;
        let encoded = header
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(SignatureError::MalformedHeader)?;
        let expected = hex::decode(encoded).map_err(|_| SignatureError::InvalidHex)?;

        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &[u8] = br#"{"action":"completed"}"#;

    #[test]
    fn valid_signature_verifies() {
        let verifier = SignatureVerifier::new("s3cret");
        let header = verifier.sign(PAYLOAD).unwrap();

        assert!(header.starts_with(SIGNATURE_PREFIX));
        assert_eq!(verifier.verify(PAYLOAD, Some(&header)), Ok(()));
    }

    #[test]
    fn known_digest_verifies() {
        // Test vector published in the GitHub webhook validation guide.
        let verifier = SignatureVerifier::new("It's a Secret to Everybody");
        let header = "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17";
        assert_eq!(verifier.verify(b"Hello, World!", Some(header)), Ok(()));
    }

    #[test]
    fn different_payload_fails() {
        let verifier = SignatureVerifier::new("s3cret");
        let header = verifier.sign(PAYLOAD).unwrap();

        assert_eq!(
            verifier.verify(b"{}", Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn different_secret_fails() {
        let header = SignatureVerifier::new("other").sign(PAYLOAD).unwrap();
        let verifier = SignatureVerifier::new("s3cret");

        assert_eq!(
            verifier.verify(PAYLOAD, Some(&header)),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn empty_secret_fails() {
        let verifier = SignatureVerifier::new("");
        assert_eq!(
            verifier.verify(PAYLOAD, Some("sha256=00")),
            Err(SignatureError::EmptySecret)
        );
    }

    #[test]
    fn missing_or_empty_header_fails() {
        let verifier = SignatureVerifier::new("s3cret");
        assert_eq!(
            verifier.verify(PAYLOAD, None),
            Err(SignatureError::MissingHeader)
        );
        assert_eq!(
            verifier.verify(PAYLOAD, Some("")),
            Err(SignatureError::MissingHeader)
        );
    }

    #[test]
    fn other_algorithm_prefix_fails() {
        let verifier = SignatureVerifier::new("s3cret");
        let header = verifier.sign(PAYLOAD).unwrap().replacen("sha256=", "sha1=", 1);

        assert_eq!(
            verifier.verify(PAYLOAD, Some(&header)),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn non_hex_signature_fails() {
        let verifier = SignatureVerifier::new("s3cret");
        assert_eq!(
            verifier.verify(PAYLOAD, Some("sha256=not-hex")),
            Err(SignatureError::InvalidHex)
        );
    }
}
