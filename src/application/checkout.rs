use super::ledger::{NewOrder, OrderLedger};
use crate::domain::event::{Instrument, PaymentInstructions};
use crate::domain::order::{OrderStatus, OrderTarget, PaymentType};
use crate::error::Result;
use crate::gateways::GatewayRegistry;
use std::sync::Arc;

/// Client checkout request: what to pay for, how much of it, and optionally
/// the instrument picked up front.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub target: OrderTarget,
    pub payment_type: PaymentType,
    pub coupon_code: Option<String>,
    pub affiliate_id: Option<String>,
    pub instrument: Option<Instrument>,
}

#[derive(Debug, Clone)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: OrderStatus,
    /// Present once an instrument has been selected and initiated.
    pub instructions: Option<PaymentInstructions>,
}

/// Orchestrates checkout: open the order, then (possibly later, possibly
/// repeatedly while pending) select an instrument and initiate the charge.
pub struct CheckoutFlow {
    ledger: Arc<OrderLedger>,
    registry: Arc<GatewayRegistry>,
}

impl CheckoutFlow {
    pub fn new(ledger: Arc<OrderLedger>, registry: Arc<GatewayRegistry>) -> Self {
        Self { ledger, registry }
    }

    pub async fn open(&self, request: CheckoutRequest) -> Result<CheckoutResponse> {
        let order = self
            .ledger
            .create_order(NewOrder {
                target: request.target,
                payment_type: request.payment_type,
                coupon_code: request.coupon_code,
                affiliate_id: request.affiliate_id,
            })
            .await?;
        match request.instrument {
            Some(instrument) => self.select_instrument(&order.id, instrument).await,
            None => Ok(CheckoutResponse {
                order_id: order.id,
                status: order.status,
                instructions: None,
            }),
        }
    }

    /// Selects (or re-selects) the payment method for a pending order and
    /// returns the rail's payment instructions.
    pub async fn select_instrument(
        &self,
        order_id: &str,
        instrument: Instrument,
    ) -> Result<CheckoutResponse> {
        let adapter = self.registry.adapter(instrument.rail())?;

        // The adapter needs the instrument on the order to shape the charge;
        // the selection is only persisted once initiation succeeded.
        let mut order = self.ledger.get_order(order_id).await?;
        order.instrument = Some(instrument.clone());
        let initiation = adapter.initiate(&order).await?;

        let order = self
            .ledger
            .record_gateway_selection(order_id, instrument, &initiation)
            .await?;
        Ok(CheckoutResponse {
            order_id: order.id,
            status: order.status,
            instructions: Some(initiation.instructions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManualTransferConfig;
    use crate::domain::money::Amount;
    use crate::domain::project::Project;
    use crate::error::PaymentError;
    use crate::gateways::manual::ManualTransferAdapter;
    use crate::infrastructure::in_memory::InMemoryStores;

    async fn flow() -> CheckoutFlow {
        let stores = InMemoryStores::new();
        stores
            .projects()
            .store(Project::new("p1", "c1", Amount(1_000_00)))
            .await
            .unwrap();
        let ledger = Arc::new(OrderLedger::new(
            stores.orders(),
            stores.projects(),
            stores.products(),
            "IDR",
        ));
        let registry = Arc::new(GatewayRegistry::new());
        registry.register(Arc::new(ManualTransferAdapter::new(ManualTransferConfig {
            bank_name: "BCA".to_string(),
            account_number: "123".to_string(),
            account_holder: "Studio".to_string(),
        })));
        CheckoutFlow::new(ledger, registry)
    }

    fn request(instrument: Option<Instrument>) -> CheckoutRequest {
        CheckoutRequest {
            target: OrderTarget::Project {
                project_id: "p1".to_string(),
            },
            payment_type: PaymentType::Dp,
            coupon_code: None,
            affiliate_id: None,
            instrument,
        }
    }

    #[tokio::test]
    async fn test_open_without_instrument() {
        let flow = flow().await;
        let response = flow.open(request(None)).await.unwrap();
        assert_eq!(response.status, OrderStatus::Pending);
        assert!(response.instructions.is_none());
    }

    #[tokio::test]
    async fn test_open_with_manual_instrument_returns_bank_details() {
        let flow = flow().await;
        let response = flow
            .open(request(Some(Instrument::ManualTransfer)))
            .await
            .unwrap();
        assert!(matches!(
            response.instructions,
            Some(PaymentInstructions::BankTransfer { .. })
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_rail_surfaces_not_configured() {
        let flow = flow().await;
        let response = flow.open(request(None)).await.unwrap();
        let result = flow
            .select_instrument(&response.order_id, Instrument::Qris)
            .await;
        assert!(matches!(result, Err(PaymentError::NotConfigured(_))));
        // The failed selection left the order untouched.
        let order = flow.ledger.get_order(&response.order_id).await.unwrap();
        assert!(order.instrument.is_none());
    }
}
