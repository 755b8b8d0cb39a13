pub mod csv;
pub mod license_api;
pub mod webhook;
