//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Requeue interval after a successful reconciliation (seconds)
    pub success_reconcile_timeout_secs: u64,
    /// Base of the linear failure backoff (seconds)
    /// The n-th consecutive failure waits `base * n`
    pub failure_backoff_base_secs: u64,
    /// Fixed retry interval while Keycloak is unreachable (seconds)
    /// Does not touch the failure counter
    pub keycloak_unavailable_requeue_secs: u64,
    /// Requeue interval when the reconcile function itself fails (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Exponential backoff starting value for watch errors (milliseconds)
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value for watch errors (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Maximum concurrent reconciliations
    /// Bounds the worker pool across documents; one document never runs twice at once
    pub max_concurrent_reconciliations: u16,
    /// HTTP port for metrics and probes
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to bind (seconds)
    pub server_startup_timeout_secs: u64,
    /// Poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            success_reconcile_timeout_secs: DEFAULT_SUCCESS_RECONCILE_TIMEOUT_SECS,
            failure_backoff_base_secs: DEFAULT_FAILURE_BACKOFF_BASE_SECS,
            keycloak_unavailable_requeue_secs: DEFAULT_KEYCLOAK_UNAVAILABLE_REQUEUE_SECS,
            reconciliation_error_requeue_secs: DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            success_reconcile_timeout_secs: env_var_or_default(
                "SUCCESS_RECONCILE_TIMEOUT_SECS",
                DEFAULT_SUCCESS_RECONCILE_TIMEOUT_SECS,
            ),
            failure_backoff_base_secs: env_var_or_default(
                "FAILURE_BACKOFF_BASE_SECS",
                DEFAULT_FAILURE_BACKOFF_BASE_SECS,
            ),
            keycloak_unavailable_requeue_secs: env_var_or_default(
                "KEYCLOAK_UNAVAILABLE_REQUEUE_SECS",
                DEFAULT_KEYCLOAK_UNAVAILABLE_REQUEUE_SECS,
            ),
            reconciliation_error_requeue_secs: env_var_or_default(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            server_startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            server_poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
        }
    }

    /// Get the steady-state requeue duration
    #[must_use]
    pub fn success_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.success_reconcile_timeout_secs)
    }

    /// Get the base of the linear failure backoff
    #[must_use]
    pub fn failure_backoff_base_duration(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_base_secs)
    }

    /// Get the fixed retry used while Keycloak is unavailable
    #[must_use]
    pub fn keycloak_unavailable_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.keycloak_unavailable_requeue_secs)
    }

    /// Get reconciliation error requeue duration
    #[must_use]
    pub fn reconciliation_error_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.reconciliation_error_requeue_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
#[allow(dead_code, reason = "kept alongside the other env helpers for feature flags")]
pub(crate) fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty environment variable
pub(crate) fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
