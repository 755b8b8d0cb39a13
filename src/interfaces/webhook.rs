use crate::application::ledger::OrderLedger;
use crate::application::settlement::SettlementDispatcher;
use crate::domain::event::Rail;
use crate::domain::order::OrderStatus;
use crate::error::{PaymentError, Result};
use crate::gateways::GatewayRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Produced only after the ledger call completed; the embedding HTTP server
/// answers 200 from this. A duplicate delivery is an accepted no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct IngressReceipt {
    pub order_id: String,
    pub status: OrderStatus,
    pub replayed: bool,
}

/// Maps an ingress failure to the HTTP status the rail should see. Anything
/// that is not a 200 tells the rail to retry or give up per its own policy.
pub fn http_status(error: &PaymentError) -> u16 {
    match error {
        PaymentError::AuthenticationError(_) => 401,
        PaymentError::ValidationError(_) => 400,
        PaymentError::NotConfigured(_) => 404,
        PaymentError::IllegalTransitionError { .. } => 409,
        _ => 500,
    }
}

/// Single webhook ingress per rail.
///
/// Strictly ordered: verify authenticity, normalize, apply to the ledger,
/// dispatch effects, acknowledge. An unverifiable payload is rejected with
/// no state change and no acknowledgment. Safe under concurrent duplicate
/// delivery: correctness rests on the ledger's idempotent-replay rule, not
/// on any deduplication here.
pub struct WebhookIngress {
    registry: Arc<GatewayRegistry>,
    ledger: Arc<OrderLedger>,
    dispatcher: Arc<SettlementDispatcher>,
}

impl WebhookIngress {
    pub fn new(
        registry: Arc<GatewayRegistry>,
        ledger: Arc<OrderLedger>,
        dispatcher: Arc<SettlementDispatcher>,
    ) -> Self {
        Self {
            registry,
            ledger,
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        rail: Rail,
        raw_body: &[u8],
        signature: &str,
    ) -> Result<IngressReceipt> {
        let adapter = self.registry.adapter(rail)?;
        let event = adapter.normalize_webhook(raw_body, signature).inspect_err(|e| {
            warn!(%rail, error = %e, "webhook rejected before reaching the ledger");
        })?;

        let order_id = event.order_id.clone();
        let outcome = self.ledger.apply_external_event(&order_id, event).await?;

        // The ledger write is committed; effect failures are left for the
        // rescan instead of provoking a rail retry that would only hit the
        // terminal-state guard.
        if outcome.entered_success()
            && let Err(e) = self.dispatcher.dispatch(&order_id).await
        {
            warn!(order_id, error = %e, "settlement dispatch failed after ack");
        }

        info!(%rail, order_id, status = %outcome.order.status, "webhook processed");
        Ok(IngressReceipt {
            order_id,
            status: outcome.order.status,
            replayed: matches!(
                outcome.transition,
                crate::domain::order::Transition::Replay
            ),
        })
    }
}
