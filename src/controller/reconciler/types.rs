//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::keycloak::KeycloakConnector;
use kube::Client;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0:#}")]
    ReconciliationFailed(#[from] anyhow::Error),
}

/// Why a reconciliation was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// The reconcile annotation is present
    ManualAnnotation,
    /// `nextReconcileTime` has passed
    Scheduled,
    /// `metadata.generation` moved, or the document was never reconciled
    SpecChange,
    /// The document is being deleted
    Deletion,
    /// Controller startup pass over existing documents
    Startup,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::ManualAnnotation => "manual-annotation",
            TriggerSource::Scheduled => "scheduled",
            TriggerSource::SpecChange => "spec-change",
            TriggerSource::Deletion => "deletion",
            TriggerSource::Startup => "startup",
        }
    }
}

/// Shared context handed to every reconciliation
#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    /// Opens an authenticated Keycloak session per attempt
    pub connector: Arc<dyn KeycloakConnector>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        client: Client,
        connector: Arc<dyn KeycloakConnector>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            client,
            connector,
            config,
        }
    }
}
