use crate::domain::affiliate::CommissionLog;
use crate::domain::license::License;
use crate::domain::money::commission_for;
use crate::domain::order::{Order, OrderTarget};
use crate::domain::ports::{
    AffiliateStoreRef, CommissionStoreRef, LicenseStoreRef, NotifierRef, OrderStoreRef,
    ProductStoreRef, ProjectStoreRef,
};
use crate::error::{PaymentError, Result};
use chrono::{Duration, Utc};
use tracing::{info, warn};

/// Per-effect outcome of one dispatch pass.
#[derive(Debug, Default, Clone)]
pub struct DispatchReport {
    pub completed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

impl DispatchReport {
    pub fn fully_applied(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fires the downstream effects of a settlement: project credit, license
/// issuance, commission credit, notification.
///
/// Runs once per first entry into terminal success, and again from
/// [`reconcile`] for orders still missing an artifact. Each effect is
/// individually retryable; one failing never rolls back or blocks the
/// others. Dedup guards: store lookups for license and commission, persisted
/// order markers for project credit and notification.
///
/// [`reconcile`]: SettlementDispatcher::reconcile
pub struct SettlementDispatcher {
    orders: OrderStoreRef,
    projects: ProjectStoreRef,
    products: ProductStoreRef,
    licenses: LicenseStoreRef,
    affiliates: AffiliateStoreRef,
    commissions: CommissionStoreRef,
    notifier: NotifierRef,
}

impl SettlementDispatcher {
    pub fn new(
        orders: OrderStoreRef,
        projects: ProjectStoreRef,
        products: ProductStoreRef,
        licenses: LicenseStoreRef,
        affiliates: AffiliateStoreRef,
        commissions: CommissionStoreRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            orders,
            projects,
            products,
            licenses,
            affiliates,
            commissions,
            notifier,
        }
    }

    /// Runs every settlement effect for `order_id`. Returns the per-effect
    /// report; only a missing/unsettled order is a hard error.
    pub async fn dispatch(&self, order_id: &str) -> Result<DispatchReport> {
        let mut order = self
            .orders
            .get(order_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown order {order_id}")))?;
        if !order.status.is_success() {
            return Err(PaymentError::InvalidStateError(format!(
                "order {order_id} is {}, not settled",
                order.status
            )));
        }

        let mut report = DispatchReport::default();
        self.run_effect(&mut report, "project_credit", self.credit_project(&mut order))
            .await;
        self.run_effect(&mut report, "license", self.issue_license(&order))
            .await;
        self.run_effect(&mut report, "commission", self.credit_commission(&order))
            .await;
        self.run_effect(&mut report, "notification", self.notify(&mut order))
            .await;

        info!(
            order_id,
            completed = report.completed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "settlement effects dispatched"
        );
        Ok(report)
    }

    async fn run_effect(
        &self,
        report: &mut DispatchReport,
        name: &'static str,
        effect: impl Future<Output = Result<bool>>,
    ) {
        match effect.await {
            Ok(true) => report.completed.push(name),
            Ok(false) => report.skipped.push(name),
            Err(e) => {
                warn!(effect = name, error = %e, "settlement effect failed, left for rescan");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    /// Effect 1: credit the project and unlock it on first payment.
    /// `Ok(false)` when already credited (replay/rescan).
    async fn credit_project(&self, order: &mut Order) -> Result<bool> {
        let OrderTarget::Project { project_id } = &order.target else {
            return Ok(false);
        };
        if order.project_credited {
            return Ok(false);
        }
        let mut project = self
            .projects
            .get(project_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown project {project_id}")))?;
        project.credit_payment(order.amount);
        self.projects.store(project).await?;

        order.project_credited = true;
        order.updated_at = Utc::now();
        self.orders.store(order.clone()).await?;
        Ok(true)
    }

    /// Effect 2: issue exactly one license per fulfilled product order.
    async fn issue_license(&self, order: &Order) -> Result<bool> {
        let OrderTarget::Product { product_id } = &order.target else {
            return Ok(false);
        };
        if self.licenses.get_by_order(&order.id).await?.is_some() {
            return Ok(false);
        }
        let product = self
            .products
            .get(product_id)
            .await?
            .ok_or_else(|| PaymentError::ValidationError(format!("unknown product {product_id}")))?;
        let mut license = License::issue(&order.id, product_id)
            .with_max_activations(product.max_activations);
        if let Some(days) = product.license_valid_days {
            license = license.with_expiry(Utc::now() + Duration::days(days));
        }
        info!(order_id = %order.id, key = %license.key, "license issued");
        self.licenses.store(license).await?;
        Ok(true)
    }

    /// Effect 3: at most one commission per (order, affiliate) pair.
    async fn credit_commission(&self, order: &Order) -> Result<bool> {
        let Some(affiliate_id) = &order.affiliate_id else {
            return Ok(false);
        };
        if self
            .commissions
            .get_by_order(&order.id, affiliate_id)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        let mut affiliate = self.affiliates.get(affiliate_id).await?.ok_or_else(|| {
            PaymentError::ValidationError(format!("unknown affiliate {affiliate_id}"))
        })?;
        let commission = commission_for(order.amount, affiliate.commission_rate);
        self.commissions
            .store(CommissionLog::new(&order.id, affiliate_id, commission))
            .await?;
        affiliate.earned += commission;
        self.affiliates.store(affiliate).await?;
        info!(order_id = %order.id, affiliate_id, amount = %commission, "commission credited");
        Ok(true)
    }

    /// Effect 4: user-facing settlement notification, at least once.
    async fn notify(&self, order: &mut Order) -> Result<bool> {
        if order.notified {
            return Ok(false);
        }
        let message = format!(
            "Payment of {} {} received for order {}",
            order.amount, order.currency, order.id
        );
        self.notifier.notify(order.target.id(), &message).await?;

        order.notified = true;
        order.updated_at = Utc::now();
        self.orders.store(order.clone()).await?;
        Ok(true)
    }

    /// Re-scans terminal-success orders for missing downstream artifacts and
    /// re-dispatches them. The at-least-once retry path for effects that
    /// failed on the first pass.
    pub async fn reconcile(&self) -> Result<Vec<String>> {
        let mut redispatched = Vec::new();
        for order in self.orders.all().await? {
            if !order.status.is_success() {
                continue;
            }
            if self.is_fully_effected(&order).await? {
                continue;
            }
            info!(order_id = %order.id, "rescan found missing settlement artifacts");
            self.dispatch(&order.id).await?;
            redispatched.push(order.id);
        }
        Ok(redispatched)
    }

    async fn is_fully_effected(&self, order: &Order) -> Result<bool> {
        if !order.notified {
            return Ok(false);
        }
        match &order.target {
            OrderTarget::Project { .. } => {
                if !order.project_credited {
                    return Ok(false);
                }
            }
            OrderTarget::Product { .. } => {
                if self.licenses.get_by_order(&order.id).await?.is_none() {
                    return Ok(false);
                }
            }
        }
        if let Some(affiliate_id) = &order.affiliate_id
            && self
                .commissions
                .get_by_order(&order.id, affiliate_id)
                .await?
                .is_none()
        {
            return Ok(false);
        }
        Ok(true)
    }
}
