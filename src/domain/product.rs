use super::money::Amount;
use serde::{Deserialize, Serialize};

/// A digital product sold through checkout. Fulfilled orders get a license.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Amount,
    /// Activation bound stamped onto every license issued for this product.
    pub max_activations: u32,
    /// License validity window in days; `None` means perpetual.
    pub license_valid_days: Option<i64>,
    /// Foreign id on the hosted checkout provider. Stale references are
    /// self-healed by the hosted adapter and re-persisted here.
    pub remote_reference: Option<String>,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: Amount) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            max_activations: 3,
            license_valid_days: None,
            remote_reference: None,
        }
    }
}
