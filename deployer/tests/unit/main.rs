//! Deployer tests

mod common;

mod test_ledger;
mod test_trigger;
mod test_worker;
