//! Create or update the Keycloak client.

use crate::controller::reconciler::chain::diff_sync::SyncReport;
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{KeycloakClient, KeycloakClientSpec};
use crate::keycloak::ClientRepresentation;
use async_trait::async_trait;
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct ClientStep;

#[async_trait]
impl SyncStep for ClientStep {
    fn key(&self) -> StepKey {
        StepKey::Client
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let api = ctx.api();
        let realm = ctx.realm();
        let spec = &document.spec;
        let mut representation = client_representation(spec, ctx.secret());

        let existing = api
            .get_client(realm, &spec.client_id)
            .await
            .map_err(SyncError::remote(format!("look up client {:?}", spec.client_id)))?;

        let mut report = SyncReport::default();
        let client_uuid = match existing.and_then(|client| client.id) {
            Some(id) => {
                representation.id = Some(id.clone());
                api.update_client(realm, &id, &representation)
                    .await
                    .map_err(SyncError::remote(format!("update client {:?}", spec.client_id)))?;
                report.updated.push(spec.client_id.clone());
                id
            }
            None => {
                let id = api
                    .create_client(realm, &representation)
                    .await
                    .map_err(SyncError::remote(format!("create client {:?}", spec.client_id)))?;
                info!(
                    client_id = spec.client_id.as_str(),
                    realm,
                    uuid = id.as_str(),
                    "✅ Created Keycloak client"
                );
                report.created.push(spec.client_id.clone());
                id
            }
        };

        ctx.set_client_uuid(client_uuid);
        Ok(SyncOutcome::Applied(report))
    }
}

/// Client payload for a document
///
/// Public clients never carry a secret. Authorization services are switched on
/// whenever the document declares an `authorization` block.
#[must_use]
pub fn client_representation(spec: &KeycloakClientSpec, secret: Option<&str>) -> ClientRepresentation {
    let service_accounts_enabled = !spec.public
        && (spec.service_account.as_ref().is_some_and(|sa| sa.enabled)
            || spec.authorization.is_some());

    ClientRepresentation {
        id: None,
        client_id: spec.client_id.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
        enabled: spec.enabled,
        public_client: spec.public,
        protocol: Some(spec.protocol.clone()),
        secret: if spec.public {
            None
        } else {
            secret.map(str::to_string)
        },
        root_url: spec.web_url.clone(),
        base_url: spec.home_url.clone(),
        admin_url: spec.admin_url.clone(),
        redirect_uris: spec.redirect_uris.clone(),
        web_origins: spec.web_origins.clone(),
        direct_access_grants_enabled: spec.direct_access,
        standard_flow_enabled: spec.standard_flow_enabled,
        implicit_flow_enabled: spec.implicit_flow_enabled,
        service_accounts_enabled,
        authorization_services_enabled: !spec.public && spec.authorization.is_some(),
        attributes: spec.attributes.clone(),
    }
}
