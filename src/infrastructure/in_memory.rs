use crate::domain::affiliate::{AffiliateProfile, CommissionLog, PayoutRequest, PayoutStatus};
use crate::domain::license::License;
use crate::domain::order::Order;
use crate::domain::ports::{
    AffiliateStore, AffiliateStoreRef, CommissionStore, CommissionStoreRef, LicenseStore,
    LicenseStoreRef, Notifier, NotifierRef, OrderStore, OrderStoreRef, PayoutStore, PayoutStoreRef,
    ProductStore, ProductStoreRef, ProjectStore, ProjectStoreRef,
};
use crate::domain::product::Product;
use crate::domain::project::Project;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory order store.
///
/// Uses `Arc<RwLock<HashMap>>` for shared concurrent access; the backing
/// store is the only copy of order state, so every read reflects the latest
/// committed transition.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, Order>>>,
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn store(&self, order: Order) -> Result<()> {
        self.orders.write().await.insert(order.id.clone(), order);
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<Order>> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }

    async fn all(&self) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut all: Vec<Order> = orders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProjectStore {
    projects: Arc<RwLock<HashMap<String, Project>>>,
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn store(&self, project: Project) -> Result<()> {
        self.projects
            .write()
            .await
            .insert(project.id.clone(), project);
        Ok(())
    }

    async fn get(&self, project_id: &str) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(project_id).cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryProductStore {
    products: Arc<RwLock<HashMap<String, Product>>>,
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn store(&self, product: Product) -> Result<()> {
        self.products
            .write()
            .await
            .insert(product.id.clone(), product);
        Ok(())
    }

    async fn get(&self, product_id: &str) -> Result<Option<Product>> {
        Ok(self.products.read().await.get(product_id).cloned())
    }
}

/// Licenses indexed by key, with an order-id scan for the 1:1 issuance
/// guard.
#[derive(Default, Clone)]
pub struct InMemoryLicenseStore {
    licenses: Arc<RwLock<HashMap<String, License>>>,
}

#[async_trait]
impl LicenseStore for InMemoryLicenseStore {
    async fn store(&self, license: License) -> Result<()> {
        self.licenses
            .write()
            .await
            .insert(license.key.clone(), license);
        Ok(())
    }

    async fn get_by_key(&self, key: &str) -> Result<Option<License>> {
        Ok(self.licenses.read().await.get(key).cloned())
    }

    async fn get_by_order(&self, order_id: &str) -> Result<Option<License>> {
        Ok(self
            .licenses
            .read()
            .await
            .values()
            .find(|l| l.order_id == order_id)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryAffiliateStore {
    affiliates: Arc<RwLock<HashMap<String, AffiliateProfile>>>,
}

#[async_trait]
impl AffiliateStore for InMemoryAffiliateStore {
    async fn store(&self, affiliate: AffiliateProfile) -> Result<()> {
        self.affiliates
            .write()
            .await
            .insert(affiliate.id.clone(), affiliate);
        Ok(())
    }

    async fn get(&self, affiliate_id: &str) -> Result<Option<AffiliateProfile>> {
        Ok(self.affiliates.read().await.get(affiliate_id).cloned())
    }
}

/// Commission logs keyed by (order, affiliate), which makes the uniqueness
/// invariant a plain map property.
#[derive(Default, Clone)]
pub struct InMemoryCommissionStore {
    logs: Arc<RwLock<HashMap<(String, String), CommissionLog>>>,
}

#[async_trait]
impl CommissionStore for InMemoryCommissionStore {
    async fn store(&self, log: CommissionLog) -> Result<()> {
        self.logs
            .write()
            .await
            .insert((log.order_id.clone(), log.affiliate_id.clone()), log);
        Ok(())
    }

    async fn get_by_order(
        &self,
        order_id: &str,
        affiliate_id: &str,
    ) -> Result<Option<CommissionLog>> {
        Ok(self
            .logs
            .read()
            .await
            .get(&(order_id.to_string(), affiliate_id.to_string()))
            .cloned())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryPayoutStore {
    payouts: Arc<RwLock<HashMap<String, PayoutRequest>>>,
}

#[async_trait]
impl PayoutStore for InMemoryPayoutStore {
    async fn store(&self, payout: PayoutRequest) -> Result<()> {
        self.payouts
            .write()
            .await
            .insert(payout.id.clone(), payout);
        Ok(())
    }

    async fn get(&self, payout_id: &str) -> Result<Option<PayoutRequest>> {
        Ok(self.payouts.read().await.get(payout_id).cloned())
    }

    async fn pending_for(&self, affiliate_id: &str) -> Result<Option<PayoutRequest>> {
        Ok(self
            .payouts
            .read()
            .await
            .values()
            .find(|p| p.affiliate_id == affiliate_id && p.status == PayoutStatus::Pending)
            .cloned())
    }
}

/// Records notifications instead of sending them; tests and the replay CLI
/// read them back.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()> {
        self.sent
            .write()
            .await
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

/// One bundle of every in-memory store, for wiring up the core in tests and
/// the replay CLI.
#[derive(Default, Clone)]
pub struct InMemoryStores {
    orders: InMemoryOrderStore,
    projects: InMemoryProjectStore,
    products: InMemoryProductStore,
    licenses: InMemoryLicenseStore,
    affiliates: InMemoryAffiliateStore,
    commissions: InMemoryCommissionStore,
    payouts: InMemoryPayoutStore,
    notifier: RecordingNotifier,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> OrderStoreRef {
        Arc::new(self.orders.clone())
    }

    pub fn projects(&self) -> ProjectStoreRef {
        Arc::new(self.projects.clone())
    }

    pub fn products(&self) -> ProductStoreRef {
        Arc::new(self.products.clone())
    }

    pub fn licenses(&self) -> LicenseStoreRef {
        Arc::new(self.licenses.clone())
    }

    pub fn affiliates(&self) -> AffiliateStoreRef {
        Arc::new(self.affiliates.clone())
    }

    pub fn commissions(&self) -> CommissionStoreRef {
        Arc::new(self.commissions.clone())
    }

    pub fn payouts(&self) -> PayoutStoreRef {
        Arc::new(self.payouts.clone())
    }

    pub fn notifier(&self) -> NotifierRef {
        Arc::new(self.notifier.clone())
    }

    pub async fn sent_notifications(&self) -> Vec<(String, String)> {
        self.notifier.sent().await
    }
}
