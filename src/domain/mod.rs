//! Domain entities and the ports through which they are stored.
//!
//! Everything here is rail-agnostic: rail vocabularies live in the gateway
//! adapters and arrive as [`event::CanonicalEvent`]s.

pub mod affiliate;
pub mod event;
pub mod license;
pub mod money;
pub mod order;
pub mod ports;
pub mod product;
pub mod project;
