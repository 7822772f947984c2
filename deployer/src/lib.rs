//! cdk-deployer library
//!
//! Starts builds for provisioning-engine lifecycle events, polls them to
//! completion one invocation at a time, and reports the terminal result
//! back to the engine.

pub mod app;
pub mod build;
pub mod callback;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod ledger;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
pub mod workers;
