//! Explicit configuration objects for the core and each settlement rail.
//!
//! Adapters receive their config at construction time and the registry is
//! rebuilt through an explicit [`crate::gateways::GatewayRegistry::reconfigure`]
//! call. There are no lazily-built module-level gateway handles.

use std::time::Duration;

/// Core-wide settings shared by the ledger and checkout flow.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Settlement currency code applied to every order (ISO 4217).
    pub currency: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            currency: "IDR".to_string(),
        }
    }
}

/// Static bank details shown to the payer on the manual-transfer rail.
#[derive(Debug, Clone)]
pub struct ManualTransferConfig {
    pub bank_name: String,
    pub account_number: String,
    pub account_holder: String,
}

/// Automated multi-instrument gateway credentials and bounds.
#[derive(Debug, Clone)]
pub struct AutomatedGatewayConfig {
    /// Shared secret used to sign webhook bodies (HMAC-SHA256).
    pub server_key: String,
    /// Bound applied to every remote call on this rail.
    pub call_timeout: Duration,
}

impl AutomatedGatewayConfig {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

/// Hosted checkout provider credentials and bounds.
#[derive(Debug, Clone)]
pub struct HostedCheckoutConfig {
    pub api_key: String,
    /// Secret behind the `t=..,v1=..` webhook signature header.
    pub webhook_secret: String,
    /// Bound applied to every remote call on this rail.
    pub call_timeout: Duration,
    /// Maximum accepted age of a webhook signature timestamp.
    pub signature_tolerance: Duration,
}

impl HostedCheckoutConfig {
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            webhook_secret: webhook_secret.into(),
            call_timeout: Duration::from_secs(10),
            signature_tolerance: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_config_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.currency, "IDR");
    }

    #[test]
    fn test_hosted_config_bounds() {
        let config = HostedCheckoutConfig::new("sk_test", "whsec_test");
        assert_eq!(config.signature_tolerance, Duration::from_secs(300));
        assert_eq!(config.call_timeout, Duration::from_secs(10));
    }
}
