use super::ledger::{LedgerOutcome, OrderLedger};
use super::settlement::SettlementDispatcher;
use crate::domain::affiliate::{PayoutRequest, PayoutStatus};
use crate::domain::event::{CanonicalEvent, ExternalStatus};
use crate::domain::money::Amount;
use crate::domain::ports::{AffiliateStoreRef, PayoutStoreRef, ProductStoreRef};
use crate::error::{PaymentError, Result};
use crate::gateways::hosted::HostedCheckoutAdapter;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of an admin catalog write. The local save is the primary effect;
/// a failed remote sync degrades to a warning instead of aborting it.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSyncReport {
    pub remote_reference: Option<String>,
    pub recreated: bool,
    pub warning: Option<String>,
}

/// Back-office operations: manual order confirmation/rejection, affiliate
/// payout review, and product catalog maintenance.
pub struct AdminDesk {
    ledger: Arc<OrderLedger>,
    dispatcher: Arc<SettlementDispatcher>,
    products: ProductStoreRef,
    affiliates: AffiliateStoreRef,
    payouts: PayoutStoreRef,
    /// Optional capability: absent when the deployment carries no hosted
    /// checkout rail.
    hosted: Option<Arc<HostedCheckoutAdapter>>,
}

impl AdminDesk {
    pub fn new(
        ledger: Arc<OrderLedger>,
        dispatcher: Arc<SettlementDispatcher>,
        products: ProductStoreRef,
        affiliates: AffiliateStoreRef,
        payouts: PayoutStoreRef,
        hosted: Option<Arc<HostedCheckoutAdapter>>,
    ) -> Self {
        Self {
            ledger,
            dispatcher,
            products,
            affiliates,
            payouts,
            hosted,
        }
    }

    /// Manually confirms a payment the rail cannot confirm for us
    /// (verified transfer proof, or a pre-verified pending order), then runs
    /// the full settlement dispatcher.
    pub async fn confirm_order(&self, order_id: &str) -> Result<LedgerOutcome> {
        let event = CanonicalEvent::new(order_id, ExternalStatus::Paid)
            .with_metadata(serde_json::json!({ "source": "admin_confirmation" }));
        let outcome = self.ledger.apply_external_event(order_id, event).await?;
        if outcome.entered_success() {
            self.dispatcher.dispatch(order_id).await?;
        }
        Ok(outcome)
    }

    /// Rejects a proof under review (or cancels a pending order).
    pub async fn reject_order(&self, order_id: &str, reason: &str) -> Result<LedgerOutcome> {
        info!(order_id, reason, "order rejected by admin");
        let event = CanonicalEvent::new(order_id, ExternalStatus::Failed)
            .with_metadata(serde_json::json!({ "source": "admin_rejection", "reason": reason }));
        self.ledger.apply_external_event(order_id, event).await
    }

    /// Updates a product's price locally, then pushes it to the hosted
    /// checkout provider. The local save always wins: a sync failure is
    /// logged and reported as a warning, never propagated, while a healed
    /// remote reference is persisted so later syncs stop failing.
    pub async fn update_product_price(
        &self,
        product_id: &str,
        price: Amount,
    ) -> Result<CatalogSyncReport> {
        let mut product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown product {product_id}")))?;
        product.price = Amount::new(price.value())?;
        self.products.store(product.clone()).await?;

        let Some(hosted) = &self.hosted else {
            return Ok(CatalogSyncReport {
                remote_reference: product.remote_reference,
                recreated: false,
                warning: None,
            });
        };
        match hosted.sync_product(&product).await {
            Ok(sync) => {
                if product.remote_reference.as_deref() != Some(sync.reference.as_str()) {
                    product.remote_reference = Some(sync.reference.clone());
                    self.products.store(product).await?;
                }
                Ok(CatalogSyncReport {
                    remote_reference: Some(sync.reference),
                    recreated: sync.recreated,
                    warning: None,
                })
            }
            Err(e) => {
                warn!(product_id, error = %e, "remote catalog sync failed, local price kept");
                Ok(CatalogSyncReport {
                    remote_reference: product.remote_reference,
                    recreated: false,
                    warning: Some(e.to_string()),
                })
            }
        }
    }

    /// Opens a payout request against the affiliate's withdrawable balance.
    /// At most one pending request per affiliate.
    pub async fn request_payout(&self, affiliate_id: &str, amount: Amount) -> Result<PayoutRequest> {
        let amount = Amount::new(amount.value())?;
        let affiliate = self.affiliates.get(affiliate_id).await?.ok_or_else(|| {
            PaymentError::ValidationError(format!("unknown affiliate {affiliate_id}"))
        })?;
        if self.payouts.pending_for(affiliate_id).await?.is_some() {
            return Err(PaymentError::InvalidStateError(
                "affiliate already has a pending payout request".to_string(),
            ));
        }
        if amount > affiliate.withdrawable() {
            return Err(PaymentError::ValidationError(format!(
                "payout {} exceeds withdrawable balance {}",
                amount,
                affiliate.withdrawable()
            )));
        }
        let payout = PayoutRequest::new(affiliate_id, amount);
        self.payouts.store(payout.clone()).await?;
        Ok(payout)
    }

    /// Approves or rejects a pending payout. Approval moves the amount into
    /// the affiliate's paid-out total.
    pub async fn review_payout(&self, payout_id: &str, approve: bool) -> Result<PayoutRequest> {
        let mut payout = self
            .payouts
            .get(payout_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown payout {payout_id}")))?;
        if payout.status != PayoutStatus::Pending {
            return Err(PaymentError::InvalidStateError(format!(
                "payout {payout_id} was already reviewed"
            )));
        }
        if approve {
            let mut affiliate = self.affiliates.get(&payout.affiliate_id).await?.ok_or_else(|| {
                PaymentError::ValidationError(format!("unknown affiliate {}", payout.affiliate_id))
            })?;
            affiliate.paid_out += payout.amount;
            self.affiliates.store(affiliate).await?;
            payout.status = PayoutStatus::Approved;
        } else {
            payout.status = PayoutStatus::Rejected;
        }
        self.payouts.store(payout.clone()).await?;
        Ok(payout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ledger::NewOrder;
    use crate::config::HostedCheckoutConfig;
    use crate::domain::affiliate::AffiliateProfile;
    use crate::domain::order::{OrderStatus, OrderTarget, PaymentType};
    use crate::domain::product::Product;
    use crate::domain::project::Project;
    use crate::gateways::hosted::CheckoutProviderApi;
    use crate::infrastructure::in_memory::InMemoryStores;
    use crate::infrastructure::rails::SimCheckoutProvider;
    use rust_decimal_macros::dec;

    struct Fixture {
        stores: InMemoryStores,
        desk: AdminDesk,
        provider: Arc<SimCheckoutProvider>,
    }

    async fn fixture() -> Fixture {
        let stores = InMemoryStores::new();
        stores
            .projects()
            .store(Project::new("p1", "c1", Amount(1_000_00)))
            .await
            .unwrap();
        stores
            .products()
            .store(Product::new("tpl-1", "Template", Amount(29_00)))
            .await
            .unwrap();
        let mut affiliate = AffiliateProfile::new("aff-1", dec!(0.10));
        affiliate.earned = Amount(100_00);
        stores.affiliates().store(affiliate).await.unwrap();

        let ledger = Arc::new(OrderLedger::new(
            stores.orders(),
            stores.projects(),
            stores.products(),
            "IDR",
        ));
        let dispatcher = Arc::new(SettlementDispatcher::new(
            stores.orders(),
            stores.projects(),
            stores.products(),
            stores.licenses(),
            stores.affiliates(),
            stores.commissions(),
            stores.notifier(),
        ));
        let provider = Arc::new(SimCheckoutProvider::new());
        let hosted = Arc::new(HostedCheckoutAdapter::new(
            provider.clone(),
            HostedCheckoutConfig::new("sk_test", "whsec_test"),
        ));
        let desk = AdminDesk::new(
            ledger,
            dispatcher,
            stores.products(),
            stores.affiliates(),
            stores.payouts(),
            Some(hosted),
        );
        Fixture {
            stores,
            desk,
            provider,
        }
    }

    async fn waiting_order(fixture: &Fixture) -> String {
        let ledger = &fixture.desk.ledger;
        let order = ledger
            .create_order(NewOrder {
                target: OrderTarget::Project {
                    project_id: "p1".to_string(),
                },
                payment_type: PaymentType::Dp,
                coupon_code: None,
                affiliate_id: None,
            })
            .await
            .unwrap();
        ledger
            .apply_external_event(
                &order.id,
                CanonicalEvent::new(&order.id, ExternalStatus::ProofSubmitted),
            )
            .await
            .unwrap();
        order.id
    }

    #[tokio::test]
    async fn test_confirm_runs_full_dispatch() {
        let fixture = fixture().await;
        let order_id = waiting_order(&fixture).await;
        let outcome = fixture.desk.confirm_order(&order_id).await.unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Paid);

        let project = fixture.stores.projects().get("p1").await.unwrap().unwrap();
        assert_eq!(project.paid_amount, Amount(500_00));
        assert_eq!(fixture.stores.sent_notifications().await.len(), 1);
    }

    #[tokio::test]
    async fn test_double_confirm_is_replay_without_double_credit() {
        let fixture = fixture().await;
        let order_id = waiting_order(&fixture).await;
        fixture.desk.confirm_order(&order_id).await.unwrap();
        let second = fixture.desk.confirm_order(&order_id).await.unwrap();
        assert!(!second.entered_success());
        let project = fixture.stores.projects().get("p1").await.unwrap().unwrap();
        assert_eq!(project.paid_amount, Amount(500_00));
    }

    #[tokio::test]
    async fn test_reject_moves_to_failed() {
        let fixture = fixture().await;
        let order_id = waiting_order(&fixture).await;
        let outcome = fixture
            .desk
            .reject_order(&order_id, "proof unreadable")
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_price_update_survives_remote_outage() {
        let fixture = fixture().await;
        fixture.provider.set_unreachable(true).await;
        let report = fixture
            .desk
            .update_product_price("tpl-1", Amount(39_00))
            .await
            .unwrap();
        assert!(report.warning.is_some());

        let product = fixture
            .stores
            .products()
            .get("tpl-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.price, Amount(39_00));
    }

    #[tokio::test]
    async fn test_price_update_heals_stale_reference() {
        let fixture = fixture().await;
        // First sync creates the remote product.
        let first = fixture
            .desk
            .update_product_price("tpl-1", Amount(29_00))
            .await
            .unwrap();
        let reference = first.remote_reference.unwrap();
        assert!(!first.recreated);

        // Provider loses the product; the next sync recreates and persists.
        fixture.provider.remove_product(&reference).await;
        let healed = fixture
            .desk
            .update_product_price("tpl-1", Amount(49_00))
            .await
            .unwrap();
        assert!(healed.recreated);
        let new_reference = healed.remote_reference.unwrap();
        assert_ne!(new_reference, reference);

        let product = fixture
            .stores
            .products()
            .get("tpl-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.remote_reference.as_ref(), Some(&new_reference));

        // And the corrected reference keeps working.
        let again = fixture
            .desk
            .update_product_price("tpl-1", Amount(59_00))
            .await
            .unwrap();
        assert!(!again.recreated);
        assert_eq!(again.remote_reference, Some(new_reference));
    }

    #[tokio::test]
    async fn test_one_pending_payout_per_affiliate() {
        let fixture = fixture().await;
        fixture
            .desk
            .request_payout("aff-1", Amount(40_00))
            .await
            .unwrap();
        let second = fixture.desk.request_payout("aff-1", Amount(10_00)).await;
        assert!(matches!(second, Err(PaymentError::InvalidStateError(_))));
    }

    #[tokio::test]
    async fn test_payout_bounded_by_withdrawable() {
        let fixture = fixture().await;
        let result = fixture.desk.request_payout("aff-1", Amount(200_00)).await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_approved_payout_reduces_balance() {
        let fixture = fixture().await;
        let payout = fixture
            .desk
            .request_payout("aff-1", Amount(40_00))
            .await
            .unwrap();
        let reviewed = fixture.desk.review_payout(&payout.id, true).await.unwrap();
        assert_eq!(reviewed.status, PayoutStatus::Approved);

        let affiliate = fixture
            .stores
            .affiliates()
            .get("aff-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(affiliate.withdrawable(), Amount(60_00));

        // The slot is free again after review.
        assert!(fixture.desk.request_payout("aff-1", Amount(60_00)).await.is_ok());
    }

    #[tokio::test]
    async fn test_review_is_single_shot() {
        let fixture = fixture().await;
        let payout = fixture
            .desk
            .request_payout("aff-1", Amount(40_00))
            .await
            .unwrap();
        fixture.desk.review_payout(&payout.id, false).await.unwrap();
        let again = fixture.desk.review_payout(&payout.id, true).await;
        assert!(matches!(again, Err(PaymentError::InvalidStateError(_))));
    }
}
