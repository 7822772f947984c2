//! Provisioning engine wire models
//!
//! Envelopes the engine (or a scheduler acting for it) delivers to the
//! deployer, and the callback payload the deployer sends back.

pub mod models;

pub use models::*;
