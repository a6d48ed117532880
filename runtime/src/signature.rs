//! Webhook signature verification (HMAC-SHA256, hex encoded).

use hmac::{Hmac, Mac};
use mentorlink_core::MarketplaceError;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Shared secret configured with the payment gateway.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    /// Wrap the raw secret.
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Whether no secret was configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn mac(&self) -> Result<HmacSha256, MarketplaceError> {
        HmacSha256::new_from_slice(&self.0)
            .map_err(|e| MarketplaceError::Authentication(format!("unusable webhook secret: {e}")))
    }

    /// Hex signature of `body`, as the gateway computes it.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::Authentication`] if the secret cannot key an HMAC.
    pub fn sign(&self, body: &[u8]) -> Result<String, MarketplaceError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check `signature` against the exact raw `body`.
    ///
    /// The comparison is constant time; surrounding whitespace and hex case
    /// are ignored.
    ///
    /// # Errors
    ///
    /// [`MarketplaceError::Authentication`] when the signature is missing,
    /// not hex, or does not match.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), MarketplaceError> {
        if self.is_empty() {
            return Err(MarketplaceError::Authentication("webhook secret not configured".into()));
        }
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MarketplaceError::Authentication("missing signature".into()))?;
        let expected =
            hex::decode(signature).map_err(|_| MarketplaceError::Authentication("malformed signature".into()))?;

        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| MarketplaceError::Authentication("signature mismatch".into()))
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"event":"payment.captured"}"#;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2.
        let secret = WebhookSecret::new("Jefe");
        assert_eq!(
            secret.sign(b"what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_valid_signature_passes() {
        let secret = WebhookSecret::new("whsec_test");
        let signature = secret.sign(BODY).unwrap();
        assert!(secret.verify(BODY, Some(&signature)).is_ok());
        assert!(secret.verify(BODY, Some(&signature.to_uppercase())).is_ok());
    }

    #[test]
    fn test_rejections() {
        let secret = WebhookSecret::new("whsec_test");
        let signature = secret.sign(BODY).unwrap();

        let tampered = br#"{"event":"payment.captured" }"#;
        for (body, header) in [
            (BODY, None),
            (BODY, Some("")),
            (BODY, Some("zz-not-hex")),
            (BODY, Some("deadbeef")),
            (tampered.as_slice(), Some(signature.as_str())),
        ] {
            assert!(
                matches!(secret.verify(body, header), Err(MarketplaceError::Authentication(_))),
                "{header:?}"
            );
        }

        let other = WebhookSecret::new("another");
        assert!(other.verify(BODY, Some(&signature)).is_err());
    }

    #[test]
    fn test_empty_secret_rejects_everything() {
        let secret = WebhookSecret::new("");
        let signature = secret.sign(BODY).unwrap();
        assert!(secret.verify(BODY, Some(&signature)).is_err());
    }

    #[test]
    fn test_debug_redacts() {
        assert_eq!(format!("{:?}", WebhookSecret::new("s3cret")), "WebhookSecret(***)");
    }
}
