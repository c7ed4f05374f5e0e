//! # Runtime
//!
//! Process-level wiring around the reconciler.
//!
//! - `initialization`: rustls, tracing, metrics, HTTP server and client setup
//! - `watch_loop`: the Kubernetes controller and its restart loop
//! - `error_policy`: requeue policy for reconcile errors and watch stream errors

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
