//! Per-cycle state shared by the chain steps.

use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::resolver::Resolver;
use crate::crd::ReconciliationStrategy;
use crate::keycloak::KeycloakApi;
use std::fmt;

/// Inputs of one chain run plus what earlier steps learned
///
/// Built fresh for every reconciliation; nothing here outlives the cycle.
pub struct ChainContext<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    strategy: ReconciliationStrategy,
    secret: Option<String>,
    client_uuid: Option<String>,
}

impl fmt::Debug for ChainContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainContext")
            .field("realm", &self.realm)
            .field("strategy", &self.strategy)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("client_uuid", &self.client_uuid)
            .finish_non_exhaustive()
    }
}

impl<'a> ChainContext<'a> {
    #[must_use]
    pub fn new(
        api: &'a dyn KeycloakApi,
        realm: &'a str,
        strategy: ReconciliationStrategy,
        secret: Option<String>,
    ) -> Self {
        Self {
            api,
            realm,
            strategy,
            secret,
            client_uuid: None,
        }
    }

    #[must_use]
    pub fn api(&self) -> &'a dyn KeycloakApi {
        self.api
    }

    #[must_use]
    pub fn realm(&self) -> &'a str {
        self.realm
    }

    #[must_use]
    pub fn strategy(&self) -> ReconciliationStrategy {
        self.strategy
    }

    /// Resolved client secret, `None` when Keycloak should generate it
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// UUID of the remote client, set by the client step
    ///
    /// # Errors
    /// Returns a configuration error when the client step has not run yet.
    pub fn client_uuid(&self) -> Result<&str, SyncError> {
        self.client_uuid
            .as_deref()
            .ok_or_else(|| SyncError::Configuration("client UUID is not known yet".to_string()))
    }

    pub fn set_client_uuid(&mut self, client_uuid: impl Into<String>) {
        self.client_uuid = Some(client_uuid.into());
    }

    /// Take the client UUID out of a finished run
    #[must_use]
    pub fn into_client_uuid(self) -> Option<String> {
        self.client_uuid
    }

    /// Resolver scoped to the realm only
    #[must_use]
    pub fn realm_resolver(&self) -> Resolver<'a> {
        Resolver::new(self.api, self.realm)
    }
}

/// Resolver scoped to the client of `ctx`
///
/// # Errors
/// Fails when the client step has not run yet.
pub fn client_resolver<'c>(ctx: &'c ChainContext<'_>) -> Result<Resolver<'c>, SyncError> {
    Ok(Resolver::for_client(ctx.api, ctx.realm, ctx.client_uuid()?))
}
