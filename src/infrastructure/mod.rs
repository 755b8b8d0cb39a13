//! Concrete implementations of the domain and gateway ports.

pub mod in_memory;
pub mod rails;
