//! HTTP API: configuration, content negotiation, sessions and routes.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
pub mod negotiation;
pub mod session;
