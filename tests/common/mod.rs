//! Common test utilities
//!
//! Shared setup for the integration tests: rustls initialization, an
//! in-memory Keycloak and `KeycloakClient` builders.

#![allow(
    dead_code,
    reason = "each test binary uses a different subset of these helpers"
)]

pub mod fake_keycloak;

use async_trait::async_trait;
use keycloak_client_controller::controller::reconciler::status::StatusSink;
use keycloak_client_controller::crd::{Condition, KeycloakClient};
use std::sync::{Mutex, Once};

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Build a `KeycloakClient` named after its client ID from a YAML spec body
pub fn document(spec_yaml: &str) -> KeycloakClient {
    let spec: serde_yaml::Value = serde_yaml::from_str(spec_yaml).expect("spec should parse");
    let client_id = spec["clientId"].as_str().unwrap_or("test-client").to_string();
    serde_json::from_value(serde_json::json!({
        "apiVersion": "keycloak.octopilot.io/v1",
        "kind": "KeycloakClient",
        "metadata": {
            "name": client_id,
            "namespace": "default",
            "generation": 1
        },
        "spec": serde_json::to_value(&spec).expect("spec should convert")
    }))
    .expect("document should deserialize")
}

/// Status sink that keeps every write in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub writes: Mutex<Vec<Vec<Condition>>>,
}

impl RecordingSink {
    pub fn last(&self) -> Vec<Condition> {
        self.writes
            .lock()
            .expect("sink lock")
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().expect("sink lock").len()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn write_conditions(&self, conditions: &[Condition]) -> anyhow::Result<()> {
        self.writes
            .lock()
            .expect("sink lock")
            .push(conditions.to_vec());
        Ok(())
    }
}

/// Find a condition by type
pub fn condition<'a>(conditions: &'a [Condition], condition_type: &str) -> &'a Condition {
    conditions
        .iter()
        .find(|c| c.r#type == condition_type)
        .unwrap_or_else(|| panic!("condition {condition_type} should be present"))
}
