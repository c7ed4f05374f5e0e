//! # Linear Backoff
//!
//! Retry delay for failed reconciliations. The delay grows by one base step per
//! consecutive failure: `base * (failureCount + 1)`.
//!
//! The failure count lives in the `KeycloakClient` status, so the schedule
//! survives controller restarts.
//!
//! ## Usage
//!
//! ```rust
//! use keycloak_client_controller::controller::backoff::LinearBackoff;
//! use std::time::Duration;
//!
//! let backoff = LinearBackoff::new(Duration::from_secs(10));
//! assert_eq!(backoff.delay(0), Duration::from_secs(10));
//! assert_eq!(backoff.delay(1), Duration::from_secs(20));
//! assert_eq!(backoff.delay(5), Duration::from_secs(60));
//! ```

use std::time::Duration;

/// Linear backoff calculator
///
/// Stateless: the caller passes the number of failures seen so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    base: Duration,
}

impl LinearBackoff {
    #[must_use]
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Delay before the next attempt after `failure_count` earlier failures
    ///
    /// A negative count is treated as zero. The result saturates instead of
    /// overflowing.
    #[must_use]
    pub fn delay(&self, failure_count: i64) -> Duration {
        let factor = failure_count.max(0).saturating_add(1);
        let factor = u32::try_from(factor).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor)
    }

    #[must_use]
    pub fn base(&self) -> Duration {
        self.base
    }
}
