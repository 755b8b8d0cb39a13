use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The settlement rail behind an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rail {
    ManualTransfer,
    Automated,
    HostedCheckout,
}

impl fmt::Display for Rail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rail::ManualTransfer => write!(f, "manual_transfer"),
            Rail::Automated => write!(f, "automated"),
            Rail::HostedCheckout => write!(f, "hosted_checkout"),
        }
    }
}

/// The concrete payment method chosen within a rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instrument {
    ManualTransfer,
    VirtualAccount { bank: String },
    Qris,
    Ewallet { provider: String },
    ConvenienceStore { chain: String },
    DirectDebit,
    HostedCheckout,
}

impl Instrument {
    pub fn rail(&self) -> Rail {
        match self {
            Instrument::ManualTransfer => Rail::ManualTransfer,
            Instrument::HostedCheckout => Rail::HostedCheckout,
            _ => Rail::Automated,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::ManualTransfer => write!(f, "manual_transfer"),
            Instrument::VirtualAccount { bank } => write!(f, "virtual_account:{bank}"),
            Instrument::Qris => write!(f, "qris"),
            Instrument::Ewallet { provider } => write!(f, "ewallet:{provider}"),
            Instrument::ConvenienceStore { chain } => write!(f, "cstore:{chain}"),
            Instrument::DirectDebit => write!(f, "direct_debit"),
            Instrument::HostedCheckout => write!(f, "hosted_checkout"),
        }
    }
}

/// Rail-agnostic payment status carried by a [`CanonicalEvent`].
///
/// Constructed only by gateway adapters (or the admin/proof flows); the
/// ledger never sees a rail's own vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalStatus {
    /// The rail acknowledged the charge but no funds moved yet.
    Acknowledged,
    /// A manual-transfer proof was submitted; human review required.
    ProofSubmitted,
    /// The rail reports a successful charge.
    Paid,
    /// The rail reports funds cleared.
    Settled,
    /// Explicit rail failure or cancellation.
    Failed,
    /// The instrument expired with no payment.
    Expired,
}

/// The rail-agnostic representation of a payment status change.
///
/// Produced by an adapter (or the admin flow) and consumed only by the
/// ledger's `apply_external_event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEvent {
    /// The order this event settles against, as reported by the rail.
    pub order_id: String,
    pub external_status: ExternalStatus,
    /// Rail-side handle for the charge/session, when the rail has one.
    pub external_reference: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// The rail payload stored verbatim for audit and replay.
    pub raw_metadata: serde_json::Value,
}

impl CanonicalEvent {
    pub fn new(order_id: impl Into<String>, external_status: ExternalStatus) -> Self {
        Self {
            order_id: order_id.into(),
            external_status,
            external_reference: None,
            timestamp: Utc::now(),
            raw_metadata: serde_json::Value::Null,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_metadata(mut self, raw: serde_json::Value) -> Self {
        self.raw_metadata = raw;
        self
    }
}

/// What the payer must be shown (or sent to) after initiating a charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentInstructions {
    BankTransfer {
        bank_name: String,
        account_number: String,
        account_holder: String,
    },
    VirtualAccount {
        bank: String,
        va_number: String,
    },
    QrCode {
        payload: String,
    },
    EwalletRedirect {
        url: String,
    },
    ConvenienceStore {
        chain: String,
        payment_code: String,
    },
    DirectDebit {
        bill_key: String,
        biller_code: String,
    },
    Redirect {
        url: String,
    },
}

/// Result of a gateway `initiate` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Initiation {
    pub external_reference: Option<String>,
    pub instructions: PaymentInstructions,
}
