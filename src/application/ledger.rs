use crate::domain::event::{CanonicalEvent, Initiation, Instrument};
use crate::domain::money::Amount;
use crate::domain::order::{Order, OrderStatus, OrderTarget, PaymentType, Transition};
use crate::domain::ports::{OrderStoreRef, ProductStoreRef, ProjectStoreRef};
use crate::domain::project::ProjectPaymentStatus;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Request to open an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub target: OrderTarget,
    pub payment_type: PaymentType,
    pub coupon_code: Option<String>,
    pub affiliate_id: Option<String>,
}

/// What `apply_external_event` did.
#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub order: Order,
    pub transition: Transition,
}

impl LedgerOutcome {
    /// True when this event moved the order into terminal success for the
    /// first time, which is the dispatcher's trigger.
    pub fn entered_success(&self) -> bool {
        self.transition.entered_success()
    }
}

/// Read-only status projection, safe to poll at high frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub status: OrderStatus,
    pub instrument: Option<Instrument>,
    pub last_updated: DateTime<Utc>,
}

/// Owns the canonical order entity and its state machine.
///
/// Every order mutation flows through here; UI and rail code never write an
/// order directly. `apply_external_event` serializes concurrent deliveries
/// per order, so the loser of a race observes the idempotent replay or the
/// illegal-transition rejection, never a torn state.
pub struct OrderLedger {
    orders: OrderStoreRef,
    projects: ProjectStoreRef,
    products: ProductStoreRef,
    currency: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl OrderLedger {
    pub fn new(
        orders: OrderStoreRef,
        projects: ProjectStoreRef,
        products: ProductStoreRef,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            projects,
            products,
            currency: currency.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, order_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(order_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Opens an order in `pending`, computing the amount from the target and
    /// the payment type. Amounts are fixed here and never renegotiated.
    pub async fn create_order(&self, request: NewOrder) -> Result<Order> {
        let amount = match &request.target {
            OrderTarget::Project { project_id } => {
                let project = self.projects.get(project_id).await?.ok_or_else(|| {
                    PaymentError::ValidationError(format!("unknown project {project_id}"))
                })?;
                match request.payment_type {
                    PaymentType::Full | PaymentType::Dp => {
                        if project.payment_status != ProjectPaymentStatus::Unpaid {
                            return Err(PaymentError::InvalidStateError(format!(
                                "project {project_id} already has settled payments ({})",
                                project.payment_status
                            )));
                        }
                        if request.payment_type == PaymentType::Dp {
                            project.total_cost.dp_split().0
                        } else {
                            project.total_cost
                        }
                    }
                    PaymentType::Repayment => {
                        if project.payment_status == ProjectPaymentStatus::Paid {
                            return Err(PaymentError::InvalidStateError(format!(
                                "project {project_id} is already fully paid"
                            )));
                        }
                        let outstanding = project.outstanding();
                        if outstanding.is_zero() {
                            return Err(PaymentError::InvalidPaymentTypeError(
                                "nothing outstanding to repay".to_string(),
                            ));
                        }
                        outstanding
                    }
                }
            }
            OrderTarget::Product { product_id } => {
                if request.payment_type != PaymentType::Full {
                    return Err(PaymentError::InvalidPaymentTypeError(
                        "digital products are paid in full".to_string(),
                    ));
                }
                let product = self.products.get(product_id).await?.ok_or_else(|| {
                    PaymentError::ValidationError(format!("unknown product {product_id}"))
                })?;
                product.price
            }
        };
        let amount = Amount::new(amount.value())?;

        let mut order = Order::new(
            request.target,
            request.payment_type,
            amount,
            self.currency.clone(),
        );
        order.coupon_code = request.coupon_code;
        order.affiliate_id = request.affiliate_id;

        info!(
            order_id = %order.id,
            payment_type = %order.payment_type,
            amount = %order.amount,
            "order opened"
        );
        self.orders.store(order.clone()).await?;
        Ok(order)
    }

    /// Records the chosen instrument and the rail-returned handle. Legal
    /// only while pending; re-selection before payment is an idempotent
    /// overwrite so the payer can change method.
    pub async fn record_gateway_selection(
        &self,
        order_id: &str,
        instrument: Instrument,
        initiation: &Initiation,
    ) -> Result<Order> {
        let lock = self.lock_for(order_id).await;
        let _guard = lock.lock().await;

        let mut order = self.require(order_id).await?;
        if order.status != OrderStatus::Pending {
            return Err(PaymentError::InvalidStateError(format!(
                "cannot select instrument while order is {}",
                order.status
            )));
        }
        order.instrument = Some(instrument);
        order.external_reference = initiation.external_reference.clone();
        order.updated_at = Utc::now();
        self.orders.store(order.clone()).await?;
        Ok(order)
    }

    /// The single mutation point for rail-driven status change.
    ///
    /// Replays of the current status are delivered-twice no-ops; any other
    /// move out of a terminal status is rejected and logged. The per-order
    /// guard is held across the read-modify-write.
    pub async fn apply_external_event(
        &self,
        order_id: &str,
        event: CanonicalEvent,
    ) -> Result<LedgerOutcome> {
        let lock = self.lock_for(order_id).await;
        let _guard = lock.lock().await;

        let mut order = self.require(order_id).await?;
        let target = OrderStatus::target_of(event.external_status);
        let transition = order.status.plan(target);
        match transition {
            Transition::Replay => {
                debug!(order_id, status = %order.status, "replayed event, no-op");
                Ok(LedgerOutcome { order, transition })
            }
            Transition::Illegal { from, to } => {
                warn!(order_id, %from, %to, "illegal transition rejected");
                Err(PaymentError::IllegalTransitionError {
                    order_id: order_id.to_string(),
                    from: from.to_string(),
                    to: to.to_string(),
                })
            }
            Transition::Applied { from, to } => {
                order.status = to;
                if event.external_reference.is_some() {
                    order.external_reference = event.external_reference.clone();
                }
                if !event.raw_metadata.is_null() {
                    order.raw_gateway_metadata = Some(event.raw_metadata.clone());
                }
                order.updated_at = Utc::now();
                self.orders.store(order.clone()).await?;
                info!(order_id, %from, %to, "order transitioned");
                Ok(LedgerOutcome { order, transition })
            }
        }
    }

    /// Read-only and side-effect free.
    pub async fn get_status(&self, order_id: &str) -> Result<StatusView> {
        let order = self.require(order_id).await?;
        Ok(StatusView {
            status: order.status,
            instrument: order.instrument,
            last_updated: order.updated_at,
        })
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.require(order_id).await
    }

    async fn require(&self, order_id: &str) -> Result<Order> {
        self.orders
            .get(order_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown order {order_id}")))
    }
}
