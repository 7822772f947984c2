//! Server state

use std::sync::Arc;

use crate::deploy::handler::Deployer;

/// Server state shared across handlers
pub struct ServerState {
    pub deployer: Arc<Deployer>,
}

impl ServerState {
    pub fn new(deployer: Arc<Deployer>) -> Self {
        Self { deployer }
    }
}
