use super::GatewayAdapter;
use crate::config::ManualTransferConfig;
use crate::domain::event::{CanonicalEvent, Initiation, PaymentInstructions, Rail};
use crate::domain::order::Order;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;

/// Human-verified bank transfer rail.
///
/// `initiate` hands out static bank details; there is no webhook and no
/// remote status to pull. The payer uploads a proof, which enters the ledger
/// as a `ProofSubmitted` event, and an admin confirmation is the only path
/// to `paid`.
pub struct ManualTransferAdapter {
    config: ManualTransferConfig,
}

impl ManualTransferAdapter {
    pub fn new(config: ManualTransferConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GatewayAdapter for ManualTransferAdapter {
    fn rail(&self) -> Rail {
        Rail::ManualTransfer
    }

    async fn initiate(&self, _order: &Order) -> Result<Initiation> {
        Ok(Initiation {
            external_reference: None,
            instructions: PaymentInstructions::BankTransfer {
                bank_name: self.config.bank_name.clone(),
                account_number: self.config.account_number.clone(),
                account_holder: self.config.account_holder.clone(),
            },
        })
    }

    fn normalize_webhook(&self, _raw_body: &[u8], _signature: &str) -> Result<CanonicalEvent> {
        Err(PaymentError::NotConfigured(
            "manual transfer rail has no webhook channel".to_string(),
        ))
    }

    async fn query_status(&self, _external_reference: &str) -> Result<CanonicalEvent> {
        Err(PaymentError::NotConfigured(
            "manual transfer rail has no status endpoint".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Amount;
    use crate::domain::order::{OrderTarget, PaymentType};

    fn adapter() -> ManualTransferAdapter {
        ManualTransferAdapter::new(ManualTransferConfig {
            bank_name: "BCA".to_string(),
            account_number: "8881234567".to_string(),
            account_holder: "Studio Works".to_string(),
        })
    }

    #[tokio::test]
    async fn test_initiate_returns_bank_details() {
        let order = Order::new(
            OrderTarget::Project {
                project_id: "p1".to_string(),
            },
            PaymentType::Dp,
            Amount(50_000),
            "IDR",
        );
        let initiation = adapter().initiate(&order).await.unwrap();
        assert!(initiation.external_reference.is_none());
        assert_eq!(
            initiation.instructions,
            PaymentInstructions::BankTransfer {
                bank_name: "BCA".to_string(),
                account_number: "8881234567".to_string(),
                account_holder: "Studio Works".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_no_webhook_or_pull_channel() {
        let adapter = adapter();
        assert!(matches!(
            adapter.normalize_webhook(b"{}", "sig"),
            Err(PaymentError::NotConfigured(_))
        ));
        assert!(matches!(
            adapter.query_status("ref").await,
            Err(PaymentError::NotConfigured(_))
        ));
    }
}
