//! # Chain Steps
//!
//! One module per step of the standard chain, in execution order:
//!
//! - `client.rs` - Create or update the client itself
//! - `client_roles.rs` - Client roles
//! - `realm_roles.rs` - Realm roles owned by the client, with composites
//! - `client_scopes.rs` - Default and optional client scope links
//! - `protocol_mappers.rs` - Protocol mappers on the client
//! - `service_account.rs` - Roles, groups and attributes of the service account user
//! - `authorization.rs` - Authorization scopes, resources, policies and permissions
//! - `fine_grained.rs` - Fine-grained admin permissions on the client

mod authorization;
mod client;
mod client_roles;
mod client_scopes;
mod fine_grained;
mod protocol_mappers;
mod realm_roles;
mod service_account;

pub use authorization::{
    AuthorizationPermissionsStep, AuthorizationPoliciesStep, AuthorizationResourcesStep,
    AuthorizationScopesStep,
};
pub use client::{ClientStep, client_representation};
pub use client_roles::ClientRolesStep;
pub use client_scopes::ClientScopesStep;
pub use fine_grained::FineGrainedPermissionsStep;
pub use protocol_mappers::ProtocolMappersStep;
pub use realm_roles::RealmRolesStep;
pub use service_account::ServiceAccountStep;

use crate::controller::reconciler::chain::diff_sync::{SyncTarget, diff_sync};
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::status::SyncOutcome;
use crate::crd::ReconciliationStrategy;

/// Run the diff-sync engine for one collection and turn the report into an outcome
///
/// An empty collection under `addOnly` is skipped without listing; under `full`
/// it still removes whatever exists remotely.
pub(crate) async fn sync_collection<T: SyncTarget + ?Sized>(
    target: &T,
    desired: &[T::Desired],
    strategy: ReconciliationStrategy,
    noun: &str,
) -> Result<SyncOutcome, SyncError> {
    if desired.is_empty() && !strategy.allows_delete() {
        return Ok(SyncOutcome::skipped_add_only(format!(
            "no {noun} declared, existing ones are kept"
        )));
    }
    let report = diff_sync(target, desired, strategy).await?;
    if desired.is_empty() && report.deleted.is_empty() {
        return Ok(SyncOutcome::not_configured(format!("no {noun} declared")));
    }
    Ok(SyncOutcome::Applied(report))
}
