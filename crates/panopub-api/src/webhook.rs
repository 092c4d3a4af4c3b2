//! Webhook signature verification.
//!
//! The verifier is constructed once from explicit configuration and injected
//! into the receiver; nothing reads ambient global state at call time. The
//! disable switch exists for environments where the signing secret cannot be
//! distributed and trades integrity for availability; the default is ON.

use panopub_core::signature::verify_payload;
use panopub_core::AppError;

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
    enabled: bool,
}

impl WebhookVerifier {
    /// Build a verifier. Enabled verification without a secret is a
    /// configuration error, not a silent pass.
    pub fn new(secret: Option<Vec<u8>>, enabled: bool) -> Result<Self, anyhow::Error> {
        if enabled && secret.is_none() {
            return Err(anyhow::anyhow!(
                "Webhook signature verification is enabled but no secret is configured"
            ));
        }
        if !enabled {
            tracing::warn!(
                "Webhook signature verification is DISABLED; any caller can report outcomes"
            );
        }
        Ok(Self { secret, enabled })
    }

    /// Verify a raw payload against the signature header.
    pub fn verify(&self, body: &[u8], signature_header: Option<&str>) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }

        let secret = self
            .secret
            .as_ref()
            .expect("verifier construction requires a secret when enabled");

        let Some(header) = signature_header else {
            return Err(AppError::Unauthorized("Missing signature header".to_string()));
        };

        if !verify_payload(secret, body, header) {
            return Err(AppError::Unauthorized("Invalid payload signature".to_string()));
        }

        Ok(())
    }
}
