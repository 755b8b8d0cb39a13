use super::money::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectPaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl fmt::Display for ProjectPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectPaymentStatus::Unpaid => write!(f, "UNPAID"),
            ProjectPaymentStatus::Partial => write!(f, "PARTIAL"),
            ProjectPaymentStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Operational stage of the project, flipped by the first settled payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Queued,
    InDevelopment,
    Delivered,
}

/// The commercial object being paid for. Owned by the client that requested
/// the estimate; mutated exclusively through order settlement callbacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub client_id: String,
    pub title: String,
    /// Total cost fixed when the estimate was accepted (coupon already applied).
    pub total_cost: Amount,
    /// Cumulative settled amount.
    pub paid_amount: Amount,
    pub payment_status: ProjectPaymentStatus,
    pub work_status: WorkStatus,
}

impl Project {
    pub fn new(id: impl Into<String>, client_id: impl Into<String>, total_cost: Amount) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            title: String::new(),
            total_cost,
            paid_amount: Amount::ZERO,
            payment_status: ProjectPaymentStatus::Unpaid,
            work_status: WorkStatus::Queued,
        }
    }

    pub fn outstanding(&self) -> Amount {
        if self.paid_amount >= self.total_cost {
            Amount::ZERO
        } else {
            self.total_cost - self.paid_amount
        }
    }

    /// Credits a settled payment and recomputes the payment status. The
    /// first credit unlocks the project (queued -> in development).
    pub fn credit_payment(&mut self, amount: Amount) {
        let first_payment = self.paid_amount.is_zero();
        self.paid_amount += amount;
        self.payment_status = if self.paid_amount < self.total_cost {
            ProjectPaymentStatus::Partial
        } else {
            ProjectPaymentStatus::Paid
        };
        if first_payment && self.work_status == WorkStatus::Queued {
            self.work_status = WorkStatus::InDevelopment;
        }
    }
}
