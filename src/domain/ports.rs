use super::affiliate::{AffiliateProfile, CommissionLog, PayoutRequest};
use super::license::License;
use super::order::Order;
use super::product::Product;
use super::project::Project;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn store(&self, order: Order) -> Result<()>;
    async fn get(&self, order_id: &str) -> Result<Option<Order>>;
    async fn all(&self) -> Result<Vec<Order>>;
}

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn store(&self, project: Project) -> Result<()>;
    async fn get(&self, project_id: &str) -> Result<Option<Project>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn store(&self, product: Product) -> Result<()>;
    async fn get(&self, product_id: &str) -> Result<Option<Product>>;
}

#[async_trait]
pub trait LicenseStore: Send + Sync {
    async fn store(&self, license: License) -> Result<()>;
    async fn get_by_key(&self, key: &str) -> Result<Option<License>>;
    async fn get_by_order(&self, order_id: &str) -> Result<Option<License>>;
}

#[async_trait]
pub trait AffiliateStore: Send + Sync {
    async fn store(&self, affiliate: AffiliateProfile) -> Result<()>;
    async fn get(&self, affiliate_id: &str) -> Result<Option<AffiliateProfile>>;
}

#[async_trait]
pub trait CommissionStore: Send + Sync {
    async fn store(&self, log: CommissionLog) -> Result<()>;
    async fn get_by_order(&self, order_id: &str, affiliate_id: &str)
    -> Result<Option<CommissionLog>>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn store(&self, payout: PayoutRequest) -> Result<()>;
    async fn get(&self, payout_id: &str) -> Result<Option<PayoutRequest>>;
    async fn pending_for(&self, affiliate_id: &str) -> Result<Option<PayoutRequest>>;
}

/// User-facing notification channel. Settlement notifications are
/// at-least-once; duplicates are acceptable, silence is not.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, message: &str) -> Result<()>;
}

pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type ProjectStoreRef = Arc<dyn ProjectStore>;
pub type ProductStoreRef = Arc<dyn ProductStore>;
pub type LicenseStoreRef = Arc<dyn LicenseStore>;
pub type AffiliateStoreRef = Arc<dyn AffiliateStore>;
pub type CommissionStoreRef = Arc<dyn CommissionStore>;
pub type PayoutStoreRef = Arc<dyn PayoutStore>;
pub type NotifierRef = Arc<dyn Notifier>;
