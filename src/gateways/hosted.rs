use super::{GatewayAdapter, bounded};
use crate::config::HostedCheckoutConfig;
use crate::domain::event::{
    CanonicalEvent, ExternalStatus, Initiation, PaymentInstructions, Rail,
};
use crate::domain::order::Order;
use crate::domain::product::Product;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Product definition as the provider stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub name: String,
    pub price: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    /// Remote product reference, when the order is for a catalog product.
    pub product_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_reference: String,
    pub redirect_url: String,
}

/// Provider event vocabulary, parsed only inside this adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEventKind {
    #[serde(rename = "checkout.session.completed")]
    Completed,
    #[serde(rename = "checkout.session.expired")]
    Expired,
    #[serde(rename = "checkout.session.payment_failed")]
    PaymentFailed,
    #[serde(rename = "checkout.session.open")]
    Open,
}

impl SessionEventKind {
    fn normalize(self) -> ExternalStatus {
        match self {
            SessionEventKind::Completed => ExternalStatus::Paid,
            SessionEventKind::Expired => ExternalStatus::Expired,
            SessionEventKind::PaymentFailed => ExternalStatus::Failed,
            SessionEventKind::Open => ExternalStatus::Acknowledged,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatusRecord {
    pub order_id: String,
    pub session_reference: String,
    #[serde(rename = "type")]
    pub event: SessionEventKind,
}

/// Outbound API surface of the hosted checkout provider.
#[async_trait]
pub trait CheckoutProviderApi: Send + Sync {
    /// Returns the new remote product reference.
    async fn create_product(&self, product: RemoteProduct) -> Result<String>;
    /// `UpstreamNotFoundError` when the reference no longer exists remotely.
    async fn update_product(&self, reference: &str, product: RemoteProduct) -> Result<()>;
    async fn create_session(&self, request: SessionRequest) -> Result<SessionResponse>;
    async fn fetch_session(&self, session_reference: &str) -> Result<SessionStatusRecord>;
}

/// Result of a catalog sync; `recreated` tells the caller to persist the
/// corrected reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductSync {
    pub reference: String,
    pub recreated: bool,
}

/// Hosted checkout rail: the payer is redirected to a provider-rendered
/// page and success is reported exclusively via signed webhooks. No
/// client-side confirmation is trusted.
pub struct HostedCheckoutAdapter {
    api: Arc<dyn CheckoutProviderApi>,
    config: HostedCheckoutConfig,
}

impl HostedCheckoutAdapter {
    pub fn new(api: Arc<dyn CheckoutProviderApi>, config: HostedCheckoutConfig) -> Self {
        Self { api, config }
    }

    /// Pushes a product to the provider, healing a stale remote reference.
    ///
    /// An update against a reference the provider reports as missing falls
    /// back to a fresh create; the returned reference replaces the stale one
    /// so subsequent syncs stop failing.
    pub async fn sync_product(&self, product: &Product) -> Result<ProductSync> {
        let remote = RemoteProduct {
            name: product.name.clone(),
            price: product.price.value(),
            currency: "USD".to_string(),
        };
        if let Some(reference) = &product.remote_reference {
            let updated = bounded::call(
                "hosted_checkout",
                self.config.call_timeout,
                self.api.update_product(reference, remote.clone()),
            )
            .await;
            match updated {
                Ok(()) => {
                    return Ok(ProductSync {
                        reference: reference.clone(),
                        recreated: false,
                    });
                }
                Err(PaymentError::UpstreamNotFoundError(_)) => {
                    tracing::warn!(
                        product_id = %product.id,
                        stale_reference = %reference,
                        "remote product missing, recreating"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        let reference = bounded::call(
            "hosted_checkout",
            self.config.call_timeout,
            self.api.create_product(remote),
        )
        .await?;
        Ok(ProductSync {
            reference,
            recreated: product.remote_reference.is_some(),
        })
    }

    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> Result<()> {
        let mut timestamp = None;
        let mut digest = None;
        for part in signature.split(',') {
            match part.split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => digest = hex::decode(value).ok(),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or_else(|| {
            PaymentError::AuthenticationError("signature header missing timestamp".to_string())
        })?;
        let digest = digest.ok_or_else(|| {
            PaymentError::AuthenticationError("signature header missing digest".to_string())
        })?;

        let age = Utc::now().timestamp() - timestamp;
        if age.unsigned_abs() > self.config.signature_tolerance.as_secs() {
            return Err(PaymentError::AuthenticationError(
                "signature timestamp outside tolerance".to_string(),
            ));
        }

        let mut mac = HmacSha256::new_from_slice(self.config.webhook_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(raw_body);
        mac.verify_slice(&digest).map_err(|_| {
            PaymentError::AuthenticationError("webhook signature mismatch".to_string())
        })
    }
}

#[async_trait]
impl GatewayAdapter for HostedCheckoutAdapter {
    fn rail(&self) -> Rail {
        Rail::HostedCheckout
    }

    async fn initiate(&self, order: &Order) -> Result<Initiation> {
        let product_reference = match &order.target {
            crate::domain::order::OrderTarget::Product { product_id } => Some(product_id.clone()),
            _ => None,
        };
        let response = bounded::call(
            "hosted_checkout",
            self.config.call_timeout,
            self.api.create_session(SessionRequest {
                order_id: order.id.clone(),
                amount: order.amount.value(),
                currency: order.currency.clone(),
                product_reference,
            }),
        )
        .await?;
        Ok(Initiation {
            external_reference: Some(response.session_reference),
            instructions: PaymentInstructions::Redirect {
                url: response.redirect_url,
            },
        })
    }

    fn normalize_webhook(&self, raw_body: &[u8], signature: &str) -> Result<CanonicalEvent> {
        self.verify_signature(raw_body, signature)?;
        let record: SessionStatusRecord = serde_json::from_slice(raw_body)
            .map_err(|e| PaymentError::ValidationError(format!("malformed session event: {e}")))?;
        let raw: serde_json::Value = serde_json::from_slice(raw_body)?;
        Ok(CanonicalEvent::new(&record.order_id, record.event.normalize())
            .with_reference(&record.session_reference)
            .with_metadata(raw))
    }

    async fn query_status(&self, external_reference: &str) -> Result<CanonicalEvent> {
        let record = bounded::call(
            "hosted_checkout",
            self.config.call_timeout,
            self.api.fetch_session(external_reference),
        )
        .await?;
        let raw = serde_json::to_value(&record)?;
        Ok(CanonicalEvent::new(&record.order_id, record.event.normalize())
            .with_reference(&record.session_reference)
            .with_metadata(raw))
    }
}
