//! Deployment models

pub mod operation;
pub mod request;
pub mod result;
pub mod status;
