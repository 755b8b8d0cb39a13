use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    Active,
    Revoked,
}

/// Issued 1:1 with a fulfilled digital-product order. Keys are generated at
/// issuance and never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    pub key: String,
    pub order_id: String,
    pub product_id: String,
    pub status: LicenseStatus,
    /// Devices counted against the activation bound. `activations()` is the
    /// length of this set.
    pub devices: Vec<String>,
    pub max_activations: u32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Result of an activation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The device was already counted; nothing changed.
    AlreadyActive,
    /// The device was newly counted against the bound.
    Counted,
    /// Rejected: revoked, expired, wrong product, or over the bound.
    /// The activation set is untouched.
    Rejected,
}

impl License {
    pub fn issue(order_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        Self {
            key: generate_key(),
            order_id: order_id.into(),
            product_id: product_id.into(),
            status: LicenseStatus::Active,
            devices: Vec::new(),
            max_activations: 1,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_max_activations(mut self, max_activations: u32) -> Self {
        self.max_activations = max_activations;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn activations(&self) -> u32 {
        self.devices.len() as u32
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Activates `device_id` for `product_id`. An unrecognized device beyond
    /// `max_activations` is rejected, never clamped in.
    pub fn activate(&mut self, product_id: &str, device_id: &str, now: DateTime<Utc>) -> Activation {
        if self.status != LicenseStatus::Active
            || self.product_id != product_id
            || self.is_expired(now)
        {
            return Activation::Rejected;
        }
        if self.devices.iter().any(|d| d == device_id) {
            return Activation::AlreadyActive;
        }
        if self.activations() >= self.max_activations {
            return Activation::Rejected;
        }
        self.devices.push(device_id.to_string());
        Activation::Counted
    }

    pub fn revoke(&mut self) {
        self.status = LicenseStatus::Revoked;
    }
}

/// Opaque license key: four uppercase-hex groups from a v4 uuid.
fn generate_key() -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{}-{}-{}-{}", &hex[0..8], &hex[8..16], &hex[16..24], &hex[24..32])
}
