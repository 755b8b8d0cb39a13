use super::ledger::{OrderLedger, StatusView};
use super::settlement::SettlementDispatcher;
use crate::error::{PaymentError, Result};
use crate::gateways::GatewayRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Client-facing synchronous fallback: pulls the rail for current status
/// when no webhook has landed yet.
///
/// Pulls are frequency-bounded per order; within the cooldown the poller
/// answers from the ledger without touching the rail. Rails that have not
/// seen the charge yet ("not found yet") and rails with no pull channel are
/// tolerated, and a rail outage degrades to the last committed status.
pub struct StatusPoller {
    ledger: Arc<OrderLedger>,
    registry: Arc<GatewayRegistry>,
    dispatcher: Arc<SettlementDispatcher>,
    cooldown: Duration,
    last_pulled: Mutex<HashMap<String, Instant>>,
}

impl StatusPoller {
    pub fn new(
        ledger: Arc<OrderLedger>,
        registry: Arc<GatewayRegistry>,
        dispatcher: Arc<SettlementDispatcher>,
        cooldown: Duration,
    ) -> Self {
        Self {
            ledger,
            registry,
            dispatcher,
            cooldown,
            last_pulled: Mutex::new(HashMap::new()),
        }
    }

    pub async fn poll(&self, order_id: &str) -> Result<StatusView> {
        let order = self.ledger.get_order(order_id).await?;

        // Terminal orders have nothing left to learn from the rail.
        if order.status.is_terminal() {
            return self.ledger.get_status(order_id).await;
        }

        let (Some(instrument), Some(reference)) = (&order.instrument, &order.external_reference)
        else {
            return self.ledger.get_status(order_id).await;
        };

        if !self.take_pull_slot(order_id).await {
            debug!(order_id, "poll within cooldown, answering from ledger");
            return self.ledger.get_status(order_id).await;
        }

        let adapter = match self.registry.adapter(instrument.rail()) {
            Ok(adapter) => adapter,
            Err(PaymentError::NotConfigured(_)) => {
                return self.ledger.get_status(order_id).await;
            }
            Err(e) => return Err(e),
        };

        match adapter.query_status(reference).await {
            Ok(event) => {
                let outcome = self.ledger.apply_external_event(order_id, event).await?;
                if outcome.entered_success() {
                    self.dispatcher.dispatch(order_id).await?;
                }
            }
            // The rail has not registered the charge yet, or has no pull
            // channel at all; the current ledger status stands.
            Err(PaymentError::UpstreamNotFoundError(_)) | Err(PaymentError::NotConfigured(_)) => {}
            Err(e @ PaymentError::UpstreamTimeoutError { .. }) => {
                warn!(order_id, error = %e, "status pull timed out");
            }
            Err(e) => return Err(e),
        }
        self.ledger.get_status(order_id).await
    }

    /// Returns false while the per-order cooldown is still running.
    async fn take_pull_slot(&self, order_id: &str) -> bool {
        let mut last_pulled = self.last_pulled.lock().await;
        let now = Instant::now();
        match last_pulled.get(order_id) {
            Some(at) if now.duration_since(*at) < self.cooldown => false,
            _ => {
                last_pulled.insert(order_id.to_string(), now);
                true
            }
        }
    }
}
