//! EC2 Launcher Library
//!
//! Drives Terraform through init, apply and output retrieval, and publishes
//! the deployment status for pollers.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod server;
pub mod storage;
pub mod utils;
