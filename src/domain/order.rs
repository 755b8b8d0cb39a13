use super::event::{ExternalStatus, Instrument};
use super::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How much of the target the order pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    /// The whole estimate (or product price) in one order.
    Full,
    /// Down payment: half the estimate total, fixed at creation.
    Dp,
    /// The outstanding balance after a settled down payment.
    Repayment,
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentType::Full => write!(f, "full"),
            PaymentType::Dp => write!(f, "dp"),
            PaymentType::Repayment => write!(f, "repayment"),
        }
    }
}

/// The commercial object the order settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrderTarget {
    Project { project_id: String },
    Product { product_id: String },
}

impl OrderTarget {
    pub fn id(&self) -> &str {
        match self {
            OrderTarget::Project { project_id } => project_id,
            OrderTarget::Product { product_id } => product_id,
        }
    }

    pub fn is_product(&self) -> bool {
        matches!(self, OrderTarget::Product { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    WaitingVerification,
    Paid,
    Settled,
    Failed,
    Expired,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::WaitingVerification => write!(f, "waiting_verification"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Settled => write!(f, "settled"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Expired => write!(f, "expired"),
        }
    }
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Settled | OrderStatus::Failed | OrderStatus::Expired
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Settled)
    }

    /// The status an external event drives toward.
    pub fn target_of(status: ExternalStatus) -> OrderStatus {
        match status {
            ExternalStatus::Acknowledged => OrderStatus::Pending,
            ExternalStatus::ProofSubmitted => OrderStatus::WaitingVerification,
            ExternalStatus::Paid => OrderStatus::Paid,
            ExternalStatus::Settled => OrderStatus::Settled,
            ExternalStatus::Failed => OrderStatus::Failed,
            ExternalStatus::Expired => OrderStatus::Expired,
        }
    }

    /// Plans the move this status would make toward `target` without
    /// mutating anything. The ledger owns the actual write.
    ///
    /// Same-state moves are replays (the idempotency guarantee); everything
    /// the state machine does not allow is illegal, including every move out
    /// of a terminal status except the sanctioned paid -> settled clearing.
    pub fn plan(&self, target: OrderStatus) -> Transition {
        if *self == target {
            return Transition::Replay;
        }
        let legal = matches!(
            (self, target),
            (
                OrderStatus::Pending,
                OrderStatus::WaitingVerification
                    | OrderStatus::Paid
                    | OrderStatus::Settled
                    | OrderStatus::Failed
                    | OrderStatus::Expired,
            ) | (
                OrderStatus::WaitingVerification,
                OrderStatus::Paid | OrderStatus::Settled | OrderStatus::Failed,
            ) | (OrderStatus::Paid, OrderStatus::Settled)
        );
        if legal {
            Transition::Applied { from: *self, to: target }
        } else {
            Transition::Illegal { from: *self, to: target }
        }
    }
}

/// Outcome of planning a status move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied { from: OrderStatus, to: OrderStatus },
    /// The order is already in the target status; a duplicate delivery.
    Replay,
    Illegal { from: OrderStatus, to: OrderStatus },
}

impl Transition {
    /// True when this move enters terminal success for the first time.
    /// Paid -> settled is a clearing signal, not a new settlement, so it
    /// does not count.
    pub fn entered_success(&self) -> bool {
        matches!(
            self,
            Transition::Applied { from, to }
                if to.is_success() && !from.is_success()
        )
    }
}

/// The unit of settlement. Mutated only by the ledger, never deleted;
/// failed and expired orders are retained for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub target: OrderTarget,
    pub payment_type: PaymentType,
    /// Minor units, fixed at creation; never renegotiated.
    pub amount: Amount,
    pub currency: String,
    pub status: OrderStatus,
    pub instrument: Option<Instrument>,
    pub external_reference: Option<String>,
    pub coupon_code: Option<String>,
    pub affiliate_id: Option<String>,
    /// The last rail payload, verbatim, for audit and replay.
    pub raw_gateway_metadata: Option<serde_json::Value>,
    /// Set once the project credit side effect has been applied.
    pub project_credited: bool,
    /// Set once the settlement notification has gone out.
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        target: OrderTarget,
        payment_type: PaymentType,
        amount: Amount,
        currency: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            target,
            payment_type,
            amount,
            currency: currency.into(),
            status: OrderStatus::Pending,
            instrument: None,
            external_reference: None,
            coupon_code: None,
            affiliate_id: None,
            raw_gateway_metadata: None,
            project_credited: false,
            notified: false,
            created_at: now,
            updated_at: now,
        }
    }
}
