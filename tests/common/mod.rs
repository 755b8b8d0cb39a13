#![allow(dead_code)]

use hmac::{Hmac, Mac};
use settleflow::application::admin::AdminDesk;
use settleflow::application::checkout::CheckoutFlow;
use settleflow::application::ledger::OrderLedger;
use settleflow::application::settlement::SettlementDispatcher;
use settleflow::config::{AutomatedGatewayConfig, HostedCheckoutConfig, ManualTransferConfig};
use settleflow::gateways::GatewayRegistry;
use settleflow::gateways::automated::AutomatedGatewayAdapter;
use settleflow::gateways::hosted::HostedCheckoutAdapter;
use settleflow::gateways::manual::ManualTransferAdapter;
use settleflow::infrastructure::in_memory::InMemoryStores;
use settleflow::infrastructure::rails::{SimAutomatedRail, SimCheckoutProvider};
use settleflow::interfaces::webhook::WebhookIngress;
use sha2::Sha256;
use std::sync::Arc;

pub const AUTOMATED_KEY: &str = "test-server-key";
pub const HOSTED_SECRET: &str = "whsec_test";

/// The fully wired core with all three rails on simulated upstreams.
pub struct Stack {
    pub stores: InMemoryStores,
    pub rail: Arc<SimAutomatedRail>,
    pub provider: Arc<SimCheckoutProvider>,
    pub registry: Arc<GatewayRegistry>,
    pub ledger: Arc<OrderLedger>,
    pub dispatcher: Arc<SettlementDispatcher>,
    pub flow: CheckoutFlow,
    pub admin: AdminDesk,
    pub ingress: WebhookIngress,
}

pub fn stack() -> Stack {
    let stores = InMemoryStores::new();

    let rail = Arc::new(SimAutomatedRail::new());
    let provider = Arc::new(SimCheckoutProvider::new());
    let hosted = Arc::new(HostedCheckoutAdapter::new(
        provider.clone(),
        HostedCheckoutConfig::new("sk_test", HOSTED_SECRET),
    ));

    let registry = Arc::new(GatewayRegistry::new());
    registry.register(Arc::new(ManualTransferAdapter::new(ManualTransferConfig {
        bank_name: "Bank Central".to_string(),
        account_number: "1234567890".to_string(),
        account_holder: "Settleflow Ltd".to_string(),
    })));
    registry.register(Arc::new(AutomatedGatewayAdapter::new(
        rail.clone(),
        AutomatedGatewayConfig::new(AUTOMATED_KEY),
    )));
    registry.register(hosted.clone());

    let ledger = Arc::new(OrderLedger::new(
        stores.orders(),
        stores.projects(),
        stores.products(),
        "IDR",
    ));
    let dispatcher = Arc::new(SettlementDispatcher::new(
        stores.orders(),
        stores.projects(),
        stores.products(),
        stores.licenses(),
        stores.affiliates(),
        stores.commissions(),
        stores.notifier(),
    ));
    let flow = CheckoutFlow::new(ledger.clone(), registry.clone());
    let admin = AdminDesk::new(
        ledger.clone(),
        dispatcher.clone(),
        stores.products(),
        stores.affiliates(),
        stores.payouts(),
        Some(hosted),
    );
    let ingress = WebhookIngress::new(registry.clone(), ledger.clone(), dispatcher.clone());

    Stack {
        stores,
        rail,
        provider,
        registry,
        ledger,
        dispatcher,
        flow,
        admin,
        ingress,
    }
}

/// Plain HMAC-SHA256 hex over the body, as the automated rail signs.
pub fn sign_automated(body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(AUTOMATED_KEY.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// `t=..,v1=..` header over `{t}.{body}`, as the hosted provider signs.
pub fn sign_hosted(body: &[u8]) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(HOSTED_SECRET.as_bytes()).unwrap();
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
