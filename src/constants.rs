//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue interval after a successful reconciliation (seconds)
pub const DEFAULT_SUCCESS_RECONCILE_TIMEOUT_SECS: u64 = 3600;

/// Base of the linear failure backoff (seconds): `base * (failureCount + 1)`
pub const DEFAULT_FAILURE_BACKOFF_BASE_SECS: u64 = 10;

/// Fixed retry interval while Keycloak itself cannot be reached (seconds)
pub const DEFAULT_KEYCLOAK_UNAVAILABLE_REQUEUE_SECS: u64 = 60;

/// Requeue interval when the reconcile function itself errors,
/// e.g. the final status patch was rejected (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default exponential backoff starting value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Default number of documents reconciled in parallel
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default timeout applied to every Keycloak admin API call (seconds)
pub const DEFAULT_KEYCLOAK_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Realm used to obtain admin tokens when none is configured
pub const DEFAULT_KEYCLOAK_AUTH_REALM: &str = "master";

/// Client used to obtain admin tokens when none is configured
pub const DEFAULT_KEYCLOAK_ADMIN_CLIENT_ID: &str = "admin-cli";

/// Finalizer placed on every KeycloakClient so the remote client can be removed first
pub const FINALIZER_NAME: &str = "keycloak.octopilot.io/client-finalizer";

/// Annotation that keeps the remote client when the KeycloakClient is deleted
pub const PRESERVE_RESOURCES_ON_DELETION_ANNOTATION: &str =
    "keycloak.octopilot.io/preserve-resources-on-deletion";

/// Annotation that forces a reconciliation regardless of generation
pub const RECONCILE_TRIGGER_ANNOTATION: &str = "keycloak.octopilot.io/reconcile";

/// Field manager used for server-side status patches
pub const FIELD_MANAGER: &str = "keycloak-client-controller";

/// Status value written after a successful reconciliation
pub const STATUS_OK: &str = "OK";

/// Secret key used when a client secret reference names only the Secret
pub const DEFAULT_CLIENT_SECRET_KEY: &str = "clientSecret";

/// Keycloak client that owns fine-grained admin permissions
pub const REALM_MANAGEMENT_CLIENT: &str = "realm-management";

/// Server feature gating fine-grained admin permissions (v1)
pub const ADMIN_FINE_GRAINED_AUTHZ_FEATURE: &str = "ADMIN_FINE_GRAINED_AUTHZ";

/// Authorization policy Keycloak creates with every resource server
pub const DEFAULT_POLICY_NAME: &str = "Default Policy";

/// Authorization permission Keycloak creates with every resource server
pub const DEFAULT_PERMISSION_NAME: &str = "Default Permission";

/// Authorization resource Keycloak creates with every resource server
pub const DEFAULT_RESOURCE_NAME: &str = "Default Resource";
