mod common;

use common::stack;
use settleflow::application::checkout::CheckoutRequest;
use settleflow::application::poller::StatusPoller;
use settleflow::domain::event::Instrument;
use settleflow::domain::money::Amount;
use settleflow::domain::order::{OrderStatus, OrderTarget, PaymentType};
use settleflow::domain::project::Project;
use settleflow::gateways::automated::RailTransactionStatus;
use std::time::Duration;

#[tokio::test]
async fn test_poll_recovers_settlement_after_missed_webhook() {
    let stack = stack();
    stack
        .stores
        .projects()
        .store(Project::new("p1", "client-1", Amount(1_000_00)))
        .await
        .unwrap();
    let order_id = stack
        .flow
        .open(CheckoutRequest {
            target: OrderTarget::Project {
                project_id: "p1".to_string(),
            },
            payment_type: PaymentType::Full,
            coupon_code: None,
            affiliate_id: None,
            instrument: None,
        })
        .await
        .unwrap()
        .order_id;
    stack
        .flow
        .select_instrument(&order_id, Instrument::Qris)
        .await
        .unwrap();
    let reference = stack
        .ledger
        .get_order(&order_id)
        .await
        .unwrap()
        .external_reference
        .unwrap();

    // The payer paid but the webhook never arrived.
    stack
        .rail
        .mark(&reference, RailTransactionStatus::Settlement)
        .await;

    let poller = StatusPoller::new(
        stack.ledger.clone(),
        stack.registry.clone(),
        stack.dispatcher.clone(),
        Duration::from_secs(60),
    );
    let view = poller.poll(&order_id).await.unwrap();
    assert_eq!(view.status, OrderStatus::Settled);

    // Recovery runs the same settlement effects a webhook would have.
    let project = stack.stores.projects().get("p1").await.unwrap().unwrap();
    assert_eq!(project.paid_amount, Amount(1_000_00));
    assert_eq!(stack.stores.sent_notifications().await.len(), 1);

    // A terminal order answers from the ledger without another rail call.
    let again = poller.poll(&order_id).await.unwrap();
    assert_eq!(again.status, OrderStatus::Settled);
}
