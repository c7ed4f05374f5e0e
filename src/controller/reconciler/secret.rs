//! # Client Secret Lookup
//!
//! Reads the client secret a `KeycloakClient` refers to from a Kubernetes
//! Secret in the document's namespace.

use crate::controller::reconciler::validation::{SecretReference, ValidationError};
use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::Api;
use tracing::debug;

/// Resolve a secret reference to its value
///
/// Returns `None` for an empty reference. A missing Secret or key is a
/// [`ValidationError::MissingSecret`].
pub async fn resolve_client_secret(
    client: &kube::Client,
    namespace: &str,
    reference: &str,
) -> Result<Option<String>> {
    let Some(reference) = SecretReference::parse(reference)? else {
        return Ok(None);
    };
    let missing = || ValidationError::MissingSecret {
        namespace: namespace.to_string(),
        name: reference.name.clone(),
        key: reference.key.clone(),
    };

    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api
        .get_opt(&reference.name)
        .await
        .with_context(|| format!("Failed to read Secret {namespace}/{}", reference.name))?
        .ok_or_else(missing)?;

    let value = secret_value(&secret, &reference.key).ok_or_else(missing)?;
    debug!(
        secret.name = reference.name.as_str(),
        secret.key = reference.key.as_str(),
        "Resolved client secret"
    );
    Ok(Some(value))
}

/// Value of `key`, from `data` or else `stringData`
fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok())
        .or_else(|| {
            secret
                .string_data
                .as_ref()
                .and_then(|data| data.get(key))
                .cloned()
        })
        .map(|value| value.trim_end_matches(['\n', '\r']).to_string())
        .filter(|value| !value.is_empty())
}
