use super::{GatewayAdapter, bounded};
use crate::config::AutomatedGatewayConfig;
use crate::domain::event::{
    CanonicalEvent, ExternalStatus, Initiation, Instrument, PaymentInstructions, Rail,
};
use crate::domain::order::Order;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// Charge shapes the automated gateway understands, one per instrument
/// family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChargeKind {
    VirtualAccount { bank: String },
    Qris,
    Ewallet { provider: String },
    ConvenienceStore { chain: String },
    DirectDebit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub order_id: String,
    pub gross_amount: i64,
    pub currency: String,
    pub charge: ChargeKind,
}

/// Rail-side display payload returned by a charge, by instrument family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChargeDetail {
    VaNumber { bank: String, number: String },
    QrString { payload: String },
    DeeplinkRedirect { url: String },
    PaymentCode { chain: String, code: String },
    Bill { bill_key: String, biller_code: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub reference: String,
    pub detail: ChargeDetail,
}

/// The rail's own status vocabulary. Parsed only inside this adapter and
/// normalized before anything reaches the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RailTransactionStatus {
    Pending,
    Capture,
    Settlement,
    Deny,
    Cancel,
    Expire,
}

impl RailTransactionStatus {
    fn normalize(self) -> ExternalStatus {
        match self {
            RailTransactionStatus::Pending => ExternalStatus::Acknowledged,
            RailTransactionStatus::Capture => ExternalStatus::Paid,
            RailTransactionStatus::Settlement => ExternalStatus::Settled,
            RailTransactionStatus::Deny | RailTransactionStatus::Cancel => ExternalStatus::Failed,
            RailTransactionStatus::Expire => ExternalStatus::Expired,
        }
    }
}

/// One status record as the rail reports it, via webhook or status pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RailStatusRecord {
    pub order_id: String,
    pub transaction_id: String,
    pub transaction_status: RailTransactionStatus,
}

/// Outbound API surface of the automated gateway. The production
/// implementation talks HTTP; tests and the replay CLI use the in-memory
/// simulation in `infrastructure::rails`.
#[async_trait]
pub trait AutomatedRailApi: Send + Sync {
    async fn create_charge(&self, request: ChargeRequest) -> Result<ChargeResponse>;
    /// `UpstreamNotFoundError` when the rail has not seen the reference yet.
    async fn fetch_status(&self, reference: &str) -> Result<RailStatusRecord>;
}

/// Multi-instrument automated gateway: virtual accounts, QRIS, e-wallets,
/// convenience-store codes, and direct-debit bills.
pub struct AutomatedGatewayAdapter {
    api: Arc<dyn AutomatedRailApi>,
    config: AutomatedGatewayConfig,
}

impl AutomatedGatewayAdapter {
    pub fn new(api: Arc<dyn AutomatedRailApi>, config: AutomatedGatewayConfig) -> Self {
        Self { api, config }
    }

    fn charge_kind(&self, instrument: &Instrument) -> Result<ChargeKind> {
        match instrument {
            Instrument::VirtualAccount { bank } => Ok(ChargeKind::VirtualAccount {
                bank: bank.clone(),
            }),
            Instrument::Qris => Ok(ChargeKind::Qris),
            Instrument::Ewallet { provider } => Ok(ChargeKind::Ewallet {
                provider: provider.clone(),
            }),
            Instrument::ConvenienceStore { chain } => Ok(ChargeKind::ConvenienceStore {
                chain: chain.clone(),
            }),
            Instrument::DirectDebit => Ok(ChargeKind::DirectDebit),
            other => Err(PaymentError::ValidationError(format!(
                "instrument {other} does not belong to the automated rail"
            ))),
        }
    }

    fn verify_signature(&self, raw_body: &[u8], signature: &str) -> Result<()> {
        let digest = hex::decode(signature).map_err(|_| {
            PaymentError::AuthenticationError("signature is not valid hex".to_string())
        })?;
        let mut mac = HmacSha256::new_from_slice(self.config.server_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(raw_body);
        mac.verify_slice(&digest).map_err(|_| {
            PaymentError::AuthenticationError("webhook signature mismatch".to_string())
        })
    }
}

#[async_trait]
impl GatewayAdapter for AutomatedGatewayAdapter {
    fn rail(&self) -> Rail {
        Rail::Automated
    }

    async fn initiate(&self, order: &Order) -> Result<Initiation> {
        let instrument = order.instrument.as_ref().ok_or_else(|| {
            PaymentError::ValidationError("order has no instrument selected".to_string())
        })?;
        let request = ChargeRequest {
            order_id: order.id.clone(),
            gross_amount: order.amount.value(),
            currency: order.currency.clone(),
            charge: self.charge_kind(instrument)?,
        };
        let response = bounded::call(
            "automated",
            self.config.call_timeout,
            self.api.create_charge(request),
        )
        .await?;

        let instructions = match response.detail {
            ChargeDetail::VaNumber { bank, number } => PaymentInstructions::VirtualAccount {
                bank,
                va_number: number,
            },
            ChargeDetail::QrString { payload } => PaymentInstructions::QrCode { payload },
            ChargeDetail::DeeplinkRedirect { url } => PaymentInstructions::EwalletRedirect { url },
            ChargeDetail::PaymentCode { chain, code } => PaymentInstructions::ConvenienceStore {
                chain,
                payment_code: code,
            },
            ChargeDetail::Bill {
                bill_key,
                biller_code,
            } => PaymentInstructions::DirectDebit {
                bill_key,
                biller_code,
            },
        };
        Ok(Initiation {
            external_reference: Some(response.reference),
            instructions,
        })
    }

    fn normalize_webhook(&self, raw_body: &[u8], signature: &str) -> Result<CanonicalEvent> {
        self.verify_signature(raw_body, signature)?;
        let record: RailStatusRecord = serde_json::from_slice(raw_body)
            .map_err(|e| PaymentError::ValidationError(format!("malformed rail payload: {e}")))?;
        let raw: serde_json::Value = serde_json::from_slice(raw_body)?;
        Ok(
            CanonicalEvent::new(&record.order_id, record.transaction_status.normalize())
                .with_reference(&record.transaction_id)
                .with_metadata(raw),
        )
    }

    async fn query_status(&self, external_reference: &str) -> Result<CanonicalEvent> {
        let record = bounded::call(
            "automated",
            self.config.call_timeout,
            self.api.fetch_status(external_reference),
        )
        .await?;
        let raw = serde_json::to_value(&record)?;
        Ok(
            CanonicalEvent::new(&record.order_id, record.transaction_status.normalize())
                .with_reference(&record.transaction_id)
                .with_metadata(raw),
        )
    }
}
