//! # Controller
//!
//! Core controller modules for the Keycloak Client Controller.
//!
//! - `backoff`: Linear failure backoff
//! - `reconciler`: Core reconciliation logic
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
