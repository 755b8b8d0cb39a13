use crate::error::PaymentError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// A monetary value in minor units of the order currency.
///
/// Wrapper around `i64` to keep raw integers out of settlement arithmetic.
/// Orders always carry non-negative amounts; the zero amount is legal only
/// as a running balance, never as an order amount.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, Hash,
)]
pub struct Amount(pub i64);

impl Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(minor_units: i64) -> Result<Self, PaymentError> {
        if minor_units > 0 {
            Ok(Self(minor_units))
        } else {
            Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Down-payment split: floor on the deposit, remainder on the repayment,
    /// so the two always sum exactly to `self`.
    pub fn dp_split(&self) -> (Amount, Amount) {
        let dp = self.0 / 2;
        (Amount(dp), Amount(self.0 - dp))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Commission owed on a settled order: `amount × rate`, floored back to
/// minor units so affiliates are never over-credited by rounding.
pub fn commission_for(amount: Amount, rate: Decimal) -> Amount {
    let commission = Decimal::from(amount.0) * rate;
    Amount(commission.floor().to_i64().unwrap_or(0).max(0))
}
