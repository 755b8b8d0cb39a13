use super::money::Amount;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A referring affiliate. `earned` accrues on settlement, `paid_out` on
/// approved payouts; the withdrawable balance is the difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateProfile {
    pub id: String,
    pub commission_rate: Decimal,
    pub earned: Amount,
    pub paid_out: Amount,
    pub created_at: DateTime<Utc>,
}

impl AffiliateProfile {
    pub fn new(id: impl Into<String>, commission_rate: Decimal) -> Self {
        Self {
            id: id.into(),
            commission_rate,
            earned: Amount::ZERO,
            paid_out: Amount::ZERO,
            created_at: Utc::now(),
        }
    }

    pub fn withdrawable(&self) -> Amount {
        self.earned - self.paid_out
    }
}

/// One row per settled order that carried a referring affiliate. At most one
/// per (order, affiliate) pair; replayed settlements must not add another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionLog {
    pub id: String,
    pub order_id: String,
    pub affiliate_id: String,
    pub amount: Amount,
    pub created_at: DateTime<Utc>,
}

impl CommissionLog {
    pub fn new(
        order_id: impl Into<String>,
        affiliate_id: impl Into<String>,
        amount: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            affiliate_id: affiliate_id.into(),
            amount,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
}

/// A withdrawal request against an affiliate's earned-minus-paid balance.
/// An affiliate may have at most one pending request at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: String,
    pub affiliate_id: String,
    pub amount: Amount,
    pub status: PayoutStatus,
    pub created_at: DateTime<Utc>,
}

impl PayoutRequest {
    pub fn new(affiliate_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            affiliate_id: affiliate_id.into(),
            amount,
            status: PayoutStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
