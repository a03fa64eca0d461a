//! Deployment module

pub mod backend;
pub mod executor;
pub mod fsm;
pub mod job;
pub mod outputs;
pub mod process;
pub mod retry;
pub mod store;
