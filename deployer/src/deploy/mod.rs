//! Deployment module

pub mod fsm;
pub mod handler;
pub mod params;
pub mod poller;
pub mod reporter;
pub mod trigger;
