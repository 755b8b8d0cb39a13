mod common;

use common::stack;
use settleflow::application::checkout::CheckoutRequest;
use settleflow::domain::event::{CanonicalEvent, ExternalStatus, Instrument, PaymentInstructions};
use settleflow::domain::money::Amount;
use settleflow::domain::order::{OrderStatus, OrderTarget, PaymentType};
use settleflow::domain::project::{Project, ProjectPaymentStatus};
use settleflow::error::PaymentError;

fn project_target() -> OrderTarget {
    OrderTarget::Project {
        project_id: "p1".to_string(),
    }
}

async fn open(stack: &common::Stack, payment_type: PaymentType) -> String {
    stack
        .flow
        .open(CheckoutRequest {
            target: project_target(),
            payment_type,
            coupon_code: None,
            affiliate_id: None,
            instrument: None,
        })
        .await
        .unwrap()
        .order_id
}

#[tokio::test]
async fn test_manual_transfer_down_payment_then_repayment() {
    let stack = stack();
    stack
        .stores
        .projects()
        .store(Project::new("p1", "client-1", Amount(1_000_00)))
        .await
        .unwrap();

    // Down payment: half the estimate, paid by bank transfer.
    let dp_order = open(&stack, PaymentType::Dp).await;
    let response = stack
        .flow
        .select_instrument(&dp_order, Instrument::ManualTransfer)
        .await
        .unwrap();
    assert!(matches!(
        response.instructions,
        Some(PaymentInstructions::BankTransfer { .. })
    ));
    assert_eq!(
        stack.ledger.get_order(&dp_order).await.unwrap().amount,
        Amount(500_00)
    );

    // Payer uploads a transfer proof; the order waits for a human.
    stack
        .ledger
        .apply_external_event(
            &dp_order,
            CanonicalEvent::new(&dp_order, ExternalStatus::ProofSubmitted),
        )
        .await
        .unwrap();
    assert_eq!(
        stack.ledger.get_status(&dp_order).await.unwrap().status,
        OrderStatus::WaitingVerification
    );

    let outcome = stack.admin.confirm_order(&dp_order).await.unwrap();
    assert!(outcome.entered_success());

    let project = stack.stores.projects().get("p1").await.unwrap().unwrap();
    assert_eq!(project.paid_amount, Amount(500_00));
    assert_eq!(project.payment_status, ProjectPaymentStatus::Partial);

    // Repayment covers exactly the outstanding balance.
    let repayment = open(&stack, PaymentType::Repayment).await;
    assert_eq!(
        stack.ledger.get_order(&repayment).await.unwrap().amount,
        Amount(500_00)
    );
    stack.admin.confirm_order(&repayment).await.unwrap();

    let project = stack.stores.projects().get("p1").await.unwrap().unwrap();
    assert_eq!(project.paid_amount, Amount(1_000_00));
    assert_eq!(project.payment_status, ProjectPaymentStatus::Paid);
    assert_eq!(project.outstanding(), Amount::ZERO);

    // One settlement notification per settled order.
    assert_eq!(stack.stores.sent_notifications().await.len(), 2);
}

#[tokio::test]
async fn test_odd_total_splits_without_losing_a_unit() {
    let stack = stack();
    stack
        .stores
        .projects()
        .store(Project::new("p1", "client-1", Amount(1_001)))
        .await
        .unwrap();

    let dp_order = open(&stack, PaymentType::Dp).await;
    let dp_amount = stack.ledger.get_order(&dp_order).await.unwrap().amount;
    assert_eq!(dp_amount, Amount(500));
    stack.admin.confirm_order(&dp_order).await.unwrap();

    let repayment = open(&stack, PaymentType::Repayment).await;
    let repayment_amount = stack.ledger.get_order(&repayment).await.unwrap().amount;
    assert_eq!(repayment_amount, Amount(501));
    assert_eq!(dp_amount + repayment_amount, Amount(1_001));

    stack.admin.confirm_order(&repayment).await.unwrap();
    let project = stack.stores.projects().get("p1").await.unwrap().unwrap();
    assert_eq!(project.payment_status, ProjectPaymentStatus::Paid);
}

#[tokio::test]
async fn test_second_down_payment_rejected_once_project_partially_paid() {
    let stack = stack();
    stack
        .stores
        .projects()
        .store(Project::new("p1", "client-1", Amount(1_000_00)))
        .await
        .unwrap();

    let dp_order = open(&stack, PaymentType::Dp).await;
    stack.admin.confirm_order(&dp_order).await.unwrap();

    let result = stack
        .flow
        .open(CheckoutRequest {
            target: project_target(),
            payment_type: PaymentType::Dp,
            coupon_code: None,
            affiliate_id: None,
            instrument: None,
        })
        .await;
    assert!(matches!(result, Err(PaymentError::InvalidStateError(_))));
}

#[tokio::test]
async fn test_rejected_proof_keeps_project_untouched() {
    let stack = stack();
    stack
        .stores
        .projects()
        .store(Project::new("p1", "client-1", Amount(1_000_00)))
        .await
        .unwrap();

    let order = open(&stack, PaymentType::Dp).await;
    stack
        .ledger
        .apply_external_event(
            &order,
            CanonicalEvent::new(&order, ExternalStatus::ProofSubmitted),
        )
        .await
        .unwrap();
    stack.admin.reject_order(&order, "blurry screenshot").await.unwrap();

    assert_eq!(
        stack.ledger.get_status(&order).await.unwrap().status,
        OrderStatus::Failed
    );
    let project = stack.stores.projects().get("p1").await.unwrap().unwrap();
    assert_eq!(project.paid_amount, Amount::ZERO);
    assert!(stack.stores.sent_notifications().await.is_empty());

    // The failure is terminal; a late confirmation must not revive it.
    let late = stack.admin.confirm_order(&order).await;
    assert!(matches!(
        late,
        Err(PaymentError::IllegalTransitionError { .. })
    ));
}
