//! Protocol mappers attached to the client.

use crate::controller::reconciler::chain::diff_sync::{RemoteEntry, SyncTarget};
use crate::controller::reconciler::chain::error::SyncError;
use crate::controller::reconciler::chain::steps::sync_collection;
use crate::controller::reconciler::chain::{ChainContext, SyncStep};
use crate::controller::reconciler::status::{StepKey, SyncOutcome};
use crate::crd::{KeycloakClient, ProtocolMapper};
use crate::keycloak::{KeycloakApi, KeycloakError, ProtocolMapperRepresentation};
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolMappersStep;

#[async_trait]
impl SyncStep for ProtocolMappersStep {
    fn key(&self) -> StepKey {
        StepKey::ProtocolMappers
    }

    async fn sync(
        &self,
        ctx: &mut ChainContext<'_>,
        document: &KeycloakClient,
    ) -> Result<SyncOutcome, SyncError> {
        let target = ProtocolMapperTarget {
            api: ctx.api(),
            realm: ctx.realm(),
            client_uuid: ctx.client_uuid()?,
        };
        sync_collection(
            &target,
            &document.spec.protocol_mappers,
            ctx.strategy(),
            "protocol mappers",
        )
        .await
    }
}

struct ProtocolMapperTarget<'a> {
    api: &'a dyn KeycloakApi,
    realm: &'a str,
    client_uuid: &'a str,
}

#[async_trait]
impl SyncTarget for ProtocolMapperTarget<'_> {
    type Desired = ProtocolMapper;
    type Payload = ProtocolMapperRepresentation;

    fn kind(&self) -> &'static str {
        "protocol mapper"
    }

    fn desired_name<'d>(&self, desired: &'d ProtocolMapper) -> &'d str {
        &desired.name
    }

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError> {
        let mappers = self
            .api
            .list_protocol_mappers(self.realm, self.client_uuid)
            .await?;
        Ok(mappers
            .into_iter()
            .filter_map(|mapper| mapper.id.map(|id| RemoteEntry::new(id, mapper.name)))
            .collect())
    }

    async fn convert(
        &self,
        desired: &ProtocolMapper,
    ) -> Result<ProtocolMapperRepresentation, SyncError> {
        if desired.protocol_mapper.trim().is_empty() {
            return Err(SyncError::Configuration(
                "protocolMapper must name a mapper implementation".to_string(),
            ));
        }
        Ok(ProtocolMapperRepresentation {
            id: None,
            name: desired.name.clone(),
            protocol: desired.protocol.clone(),
            protocol_mapper: desired.protocol_mapper.clone(),
            config: desired.config.clone(),
        })
    }

    async fn create(&self, payload: &ProtocolMapperRepresentation) -> Result<(), KeycloakError> {
        self.api
            .create_protocol_mapper(self.realm, self.client_uuid, payload)
            .await
    }

    async fn update(
        &self,
        id: &str,
        payload: &ProtocolMapperRepresentation,
    ) -> Result<(), KeycloakError> {
        let mapper = ProtocolMapperRepresentation {
            id: Some(id.to_string()),
            ..payload.clone()
        };
        self.api
            .update_protocol_mapper(self.realm, self.client_uuid, id, &mapper)
            .await
    }

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError> {
        self.api
            .delete_protocol_mapper(self.realm, self.client_uuid, &entry.id)
            .await
    }
}
