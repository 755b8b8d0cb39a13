use crate::domain::license::Activation;
use crate::domain::ports::LicenseStoreRef;
use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyRequest {
    pub key: String,
    pub product_id: String,
    pub device_id: String,
}

/// The only field client software may branch on. An invalid verdict carries
/// no reason so the endpoint leaks nothing about why a key failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub valid: bool,
}

const INVALID: Verdict = Verdict { valid: false };

/// License verification endpoint used by installed product copies.
pub struct LicenseVerifier {
    licenses: LicenseStoreRef,
}

impl LicenseVerifier {
    pub fn new(licenses: LicenseStoreRef) -> Self {
        Self { licenses }
    }

    /// Unknown key, wrong product, revoked, expired, and over-bound devices
    /// all collapse to the same invalid verdict. A newly counted device is
    /// persisted before answering.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<Verdict> {
        let Some(mut license) = self.licenses.get_by_key(&request.key).await? else {
            debug!(key = %request.key, "verification against unknown key");
            return Ok(INVALID);
        };
        match license.activate(&request.product_id, &request.device_id, Utc::now()) {
            Activation::Rejected => Ok(INVALID),
            Activation::AlreadyActive => Ok(Verdict { valid: true }),
            Activation::Counted => {
                self.licenses.store(license.clone()).await?;
                info!(
                    key = %license.key,
                    device = %request.device_id,
                    used = license.activations(),
                    max = license.max_activations,
                    "device counted against license"
                );
                Ok(Verdict { valid: true })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::license::License;
    use crate::infrastructure::in_memory::InMemoryStores;

    fn request(key: &str, device: &str) -> VerifyRequest {
        VerifyRequest {
            key: key.to_string(),
            product_id: "prod-1".to_string(),
            device_id: device.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_key_is_invalid() {
        let stores = InMemoryStores::new();
        let verifier = LicenseVerifier::new(stores.licenses());
        let verdict = verifier.verify(&request("NOPE", "dev-1")).await.unwrap();
        assert!(!verdict.valid);
    }

    #[tokio::test]
    async fn test_bound_enforced_and_devices_persisted() {
        let stores = InMemoryStores::new();
        let license = License::issue("o1", "prod-1").with_max_activations(2);
        let key = license.key.clone();
        stores.licenses().store(license).await.unwrap();
        let verifier = LicenseVerifier::new(stores.licenses());

        assert!(verifier.verify(&request(&key, "dev-1")).await.unwrap().valid);
        assert!(verifier.verify(&request(&key, "dev-2")).await.unwrap().valid);
        // Third distinct device is over the bound.
        assert!(!verifier.verify(&request(&key, "dev-3")).await.unwrap().valid);
        // A counted device keeps verifying after the bound is reached.
        assert!(verifier.verify(&request(&key, "dev-1")).await.unwrap().valid);

        let stored = stores.licenses().get_by_key(&key).await.unwrap().unwrap();
        assert_eq!(stored.activations(), 2);
    }

    #[tokio::test]
    async fn test_wrong_product_is_invalid() {
        let stores = InMemoryStores::new();
        let license = License::issue("o1", "prod-2").with_max_activations(2);
        let key = license.key.clone();
        stores.licenses().store(license).await.unwrap();
        let verifier = LicenseVerifier::new(stores.licenses());
        assert!(!verifier.verify(&request(&key, "dev-1")).await.unwrap().valid);
    }
}
