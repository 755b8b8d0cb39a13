//! Application layer orchestrating the order lifecycle.
//!
//! The [`ledger::OrderLedger`] is the single mutation path for order status;
//! the checkout flow, webhook ingress, poller, and admin desk all converge on
//! it, and the [`settlement::SettlementDispatcher`] fires downstream effects
//! on first entry into terminal success.

pub mod admin;
pub mod checkout;
pub mod ledger;
pub mod poller;
pub mod settlement;
