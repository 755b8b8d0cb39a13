//! Gateway adapters: one per settlement rail.
//!
//! Each adapter owns its rail's charge/status vocabulary and translates it
//! into [`CanonicalEvent`]s before anything reaches the ledger. Remote calls
//! run through [`bounded::call`] so a slow rail resolves to a typed timeout.

pub mod automated;
pub mod bounded;
pub mod hosted;
pub mod manual;

use crate::domain::event::{CanonicalEvent, Initiation, Rail};
use crate::domain::order::Order;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn rail(&self) -> Rail;

    /// Creates the rail-side charge for an order and returns what the payer
    /// must be shown or sent to. The order already carries its instrument.
    async fn initiate(&self, order: &Order) -> Result<Initiation>;

    /// Verifies and normalizes an inbound webhook. Must reject unverifiable
    /// payloads with [`PaymentError::AuthenticationError`] before parsing
    /// anything, and must not mutate any state.
    fn normalize_webhook(&self, raw_body: &[u8], signature: &str) -> Result<CanonicalEvent>;

    /// Synchronous status pull, the poller's fallback when no webhook has
    /// landed. Rails without a pull channel return
    /// [`PaymentError::NotConfigured`].
    async fn query_status(&self, external_reference: &str) -> Result<CanonicalEvent>;
}

pub type GatewayAdapterRef = Arc<dyn GatewayAdapter>;

/// Resolves a rail to its adapter, or `NotConfigured` when the deployment
/// does not carry that rail. Rebuilt wholesale through [`reconfigure`];
/// there is no partially-reset handle state.
///
/// [`reconfigure`]: GatewayRegistry::reconfigure
#[derive(Default)]
pub struct GatewayRegistry {
    adapters: RwLock<HashMap<Rail, GatewayAdapterRef>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, adapter: GatewayAdapterRef) {
        let mut adapters = self.adapters.write().expect("registry lock poisoned");
        adapters.insert(adapter.rail(), adapter);
    }

    /// Replaces every registered adapter in one step, e.g. after credential
    /// rotation.
    pub fn reconfigure(&self, new_adapters: Vec<GatewayAdapterRef>) {
        let mut adapters = self.adapters.write().expect("registry lock poisoned");
        adapters.clear();
        for adapter in new_adapters {
            adapters.insert(adapter.rail(), adapter);
        }
    }

    pub fn adapter(&self, rail: Rail) -> Result<GatewayAdapterRef> {
        let adapters = self.adapters.read().expect("registry lock poisoned");
        adapters
            .get(&rail)
            .cloned()
            .ok_or_else(|| PaymentError::NotConfigured(rail.to_string()))
    }
}
