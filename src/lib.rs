//! Checkout bridge: payment orchestration between an e-commerce host
//! platform and a hosted checkout page.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod server;
pub mod services;
