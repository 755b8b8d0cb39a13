//! Deterministic rail simulations backing the replay CLI and the
//! integration tests. They implement the same outbound ports the production
//! HTTP clients would.

use crate::error::{PaymentError, Result};
use crate::gateways::automated::{
    AutomatedRailApi, ChargeDetail, ChargeKind, ChargeRequest, ChargeResponse, RailStatusRecord,
    RailTransactionStatus,
};
use crate::gateways::hosted::{
    CheckoutProviderApi, RemoteProduct, SessionEventKind, SessionRequest, SessionResponse,
    SessionStatusRecord,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Simulated automated multi-instrument rail. Charges are registered by
/// `create_charge` and move through statuses via [`SimAutomatedRail::mark`].
#[derive(Default)]
pub struct SimAutomatedRail {
    charges: RwLock<HashMap<String, RailStatusRecord>>,
    counter: RwLock<u64>,
}

impl SimAutomatedRail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves an existing charge to `status`, as the rail would after the
    /// payer acts.
    pub async fn mark(&self, reference: &str, status: RailTransactionStatus) {
        if let Some(record) = self.charges.write().await.get_mut(reference) {
            record.transaction_status = status;
        }
    }

    /// Registers a charge record directly, for scenarios that skip
    /// `create_charge`.
    pub async fn seed_status(
        &self,
        order_id: &str,
        reference: &str,
        status: RailTransactionStatus,
    ) {
        self.charges.write().await.insert(
            reference.to_string(),
            RailStatusRecord {
                order_id: order_id.to_string(),
                transaction_id: reference.to_string(),
                transaction_status: status,
            },
        );
    }
}

#[async_trait]
impl AutomatedRailApi for SimAutomatedRail {
    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse> {
        let mut counter = self.counter.write().await;
        *counter += 1;
        let reference = format!("trx-{counter:06}");
        self.charges.write().await.insert(
            reference.clone(),
            RailStatusRecord {
                order_id: request.order_id.clone(),
                transaction_id: reference.clone(),
                transaction_status: RailTransactionStatus::Pending,
            },
        );
        let detail = match request.charge {
            ChargeKind::VirtualAccount { bank } => ChargeDetail::VaNumber {
                bank,
                number: format!("99{counter:010}"),
            },
            ChargeKind::Qris => ChargeDetail::QrString {
                payload: format!("00020101{reference}"),
            },
            ChargeKind::Ewallet { provider } => ChargeDetail::DeeplinkRedirect {
                url: format!("https://rail.example/{provider}/{reference}"),
            },
            ChargeKind::ConvenienceStore { chain } => ChargeDetail::PaymentCode {
                chain,
                code: format!("{counter:08}"),
            },
            ChargeKind::DirectDebit => ChargeDetail::Bill {
                bill_key: format!("{counter:06}"),
                biller_code: "70012".to_string(),
            },
        };
        Ok(ChargeResponse { reference, detail })
    }

    async fn fetch_status(&self, reference: &str) -> Result<RailStatusRecord> {
        self.charges
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| PaymentError::UpstreamNotFoundError(reference.to_string()))
    }
}

/// Simulated hosted checkout provider with handles for driving scenarios:
/// sessions complete via [`SimCheckoutProvider::complete_session`], remote
/// products can vanish via [`SimCheckoutProvider::remove_product`], and the
/// whole provider can be made unreachable.
#[derive(Default)]
pub struct SimCheckoutProvider {
    pub(crate) products: RwLock<HashMap<String, RemoteProduct>>,
    sessions: RwLock<HashMap<String, SessionStatusRecord>>,
    counter: RwLock<u64>,
    unreachable: RwLock<bool>,
}

impl SimCheckoutProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.write().await = unreachable;
    }

    pub async fn remove_product(&self, reference: &str) {
        self.products.write().await.remove(reference);
    }

    pub async fn complete_session(&self, session_reference: &str) {
        if let Some(session) = self.sessions.write().await.get_mut(session_reference) {
            session.event = SessionEventKind::Completed;
        }
    }

    async fn check_reachable(&self) -> Result<()> {
        if *self.unreachable.read().await {
            Err(PaymentError::UpstreamRejectedError(
                "provider unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CheckoutProviderApi for SimCheckoutProvider {
    async fn create_product(&self, product: RemoteProduct) -> Result<String> {
        self.check_reachable().await?;
        let mut counter = self.counter.write().await;
        *counter += 1;
        let reference = format!("prod_{counter:04}");
        self.products
            .write()
            .await
            .insert(reference.clone(), product);
        Ok(reference)
    }

    async fn update_product(&self, reference: &str, product: RemoteProduct) -> Result<()> {
        self.check_reachable().await?;
        let mut products = self.products.write().await;
        match products.get_mut(reference) {
            Some(existing) => {
                *existing = product;
                Ok(())
            }
            None => Err(PaymentError::UpstreamNotFoundError(reference.to_string())),
        }
    }

    async fn create_session(&self, request: SessionRequest) -> Result<SessionResponse> {
        self.check_reachable().await?;
        let mut counter = self.counter.write().await;
        *counter += 1;
        let session_reference = format!("cs_{counter:04}");
        self.sessions.write().await.insert(
            session_reference.clone(),
            SessionStatusRecord {
                order_id: request.order_id,
                session_reference: session_reference.clone(),
                event: SessionEventKind::Open,
            },
        );
        Ok(SessionResponse {
            redirect_url: format!("https://checkout.example/s/{session_reference}"),
            session_reference,
        })
    }

    async fn fetch_session(&self, session_reference: &str) -> Result<SessionStatusRecord> {
        self.check_reachable().await?;
        self.sessions
            .read()
            .await
            .get(session_reference)
            .cloned()
            .ok_or_else(|| PaymentError::UpstreamNotFoundError(session_reference.to_string()))
    }
}
