//! # Diff-Sync Engine
//!
//! Reconciles one named collection (client roles, protocol mappers, policies, ...)
//! against its remote counterpart.
//!
//! ## Algorithm
//!
//! 1. List the remote collection once and index it by name
//! 2. Walk the desired items in declaration order: convert, then update the
//!    matching remote item or create a new one
//! 3. Under the `full` strategy delete every remote item no desired item claimed,
//!    except the names the target protects
//!
//! The first failing remote call aborts the sync. Nothing is rolled back.

use crate::controller::reconciler::chain::error::SyncError;
use crate::crd::ReconciliationStrategy;
use crate::keycloak::KeycloakError;
use crate::observability::metrics;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Remote item as far as the engine cares: its ID and its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub name: String,
}

impl RemoteEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Name to ID index over one listing of a remote collection
///
/// When Keycloak reports two items with the same name, the first one listed is
/// the one desired items are matched against.
#[derive(Debug, Default)]
pub struct RemoteEntityIndex {
    entries: Vec<RemoteEntry>,
    by_name: HashMap<String, usize>,
}

impl RemoteEntityIndex {
    #[must_use]
    pub fn new(entries: Vec<RemoteEntry>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (position, entry) in entries.iter().enumerate() {
            by_name.entry(entry.name.clone()).or_insert(position);
        }
        Self { entries, by_name }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteEntry> {
        self.by_name.get(name).map(|&position| &self.entries[position])
    }

    /// Entries whose name is not in `claimed`, sorted by name
    fn unclaimed<'a>(&'a self, claimed: &HashSet<&str>) -> Vec<&'a RemoteEntry> {
        let mut unclaimed: Vec<&RemoteEntry> = self
            .entries
            .iter()
            .filter(|entry| !claimed.contains(entry.name.as_str()))
            .collect();
        unclaimed.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        unclaimed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One remote collection the engine can reconcile
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Item as declared in the document
    type Desired: Sync;
    /// Item as sent to Keycloak
    type Payload: Send + Sync;

    /// Singular noun used in logs, errors and metrics, e.g. `client role`
    fn kind(&self) -> &'static str;

    /// Remote names that are never deleted
    fn protected_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn desired_name<'d>(&self, desired: &'d Self::Desired) -> &'d str;

    async fn list(&self) -> Result<Vec<RemoteEntry>, KeycloakError>;

    /// Build the remote payload, resolving references as needed
    async fn convert(&self, desired: &Self::Desired) -> Result<Self::Payload, SyncError>;

    async fn create(&self, payload: &Self::Payload) -> Result<(), KeycloakError>;

    async fn update(&self, id: &str, payload: &Self::Payload) -> Result<(), KeycloakError>;

    async fn delete(&self, entry: &RemoteEntry) -> Result<(), KeycloakError>;
}

/// Names touched by one sync, in the order the calls were made
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
}

impl SyncReport {
    /// True when no remote item was created or deleted
    #[must_use]
    pub fn is_steady(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }

    /// Merge another report into this one
    pub fn absorb(&mut self, other: SyncReport) {
        self.created.extend(other.created);
        self.updated.extend(other.updated);
        self.deleted.extend(other.deleted);
    }

    /// Short human-readable summary for condition messages
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} deleted",
            self.created.len(),
            self.updated.len(),
            self.deleted.len()
        )
    }
}

/// Reconcile `desired` against the remote collection behind `target`
///
/// Items sharing a name collapse into one: the last declaration wins and is
/// applied at the position of the first.
///
/// # Errors
/// `SyncError::Convert` when a payload cannot be built, `SyncError::Remote`
/// when listing or a mutating call fails. A delete answered with not-found
/// counts as done.
pub async fn diff_sync<T: SyncTarget + ?Sized>(
    target: &T,
    desired: &[T::Desired],
    strategy: ReconciliationStrategy,
) -> Result<SyncReport, SyncError> {
    let kind = target.kind();
    let remote = target
        .list()
        .await
        .map_err(SyncError::remote(format!("list {kind}s")))?;
    let index = RemoteEntityIndex::new(remote);
    debug!(
        kind,
        remote = index.len(),
        desired = desired.len(),
        strategy = strategy.as_str(),
        "sync.diff.start"
    );

    let mut report = SyncReport::default();
    let mut claimed: HashSet<&str> = HashSet::new();

    for item in collapse_by_name(target, desired) {
        let name = target.desired_name(item);
        let payload = target
            .convert(item)
            .await
            .map_err(|source| SyncError::Convert {
                kind,
                name: name.to_string(),
                source: Box::new(source),
            })?;

        match index.get(name) {
            Some(entry) => {
                target
                    .update(&entry.id, &payload)
                    .await
                    .map_err(SyncError::remote(format!("update {kind} {name:?}")))?;
                metrics::increment_sync_operations(kind, "update");
                report.updated.push(name.to_string());
            }
            None => {
                target
                    .create(&payload)
                    .await
                    .map_err(SyncError::remote(format!("create {kind} {name:?}")))?;
                metrics::increment_sync_operations(kind, "create");
                report.created.push(name.to_string());
            }
        }
        claimed.insert(name);
    }

    if strategy.allows_delete() {
        let protected = target.protected_names();
        for entry in index.unclaimed(&claimed) {
            if protected.contains(&entry.name.as_str()) {
                continue;
            }
            match target.delete(entry).await {
                Ok(()) => {}
                Err(error) if error.is_not_found() => {
                    debug!(kind, name = entry.name.as_str(), "sync.diff.already_deleted");
                }
                Err(error) => {
                    return Err(SyncError::Remote {
                        action: format!("delete {kind} {:?}", entry.name),
                        source: error,
                    });
                }
            }
            metrics::increment_sync_operations(kind, "delete");
            report.deleted.push(entry.name.clone());
        }
    }

    debug!(kind, summary = report.summary().as_str(), "sync.diff.done");
    Ok(report)
}

/// Keep the first position of each name with the content of its last declaration
fn collapse_by_name<'d, T: SyncTarget + ?Sized>(
    target: &T,
    desired: &'d [T::Desired],
) -> Vec<&'d T::Desired> {
    let mut position_of: HashMap<&str, usize> = HashMap::new();
    let mut collapsed: Vec<&T::Desired> = Vec::with_capacity(desired.len());
    for item in desired {
        let name = target.desired_name(item);
        match position_of.get(name) {
            Some(&position) => collapsed[position] = item,
            None => {
                position_of.insert(name, collapsed.len());
                collapsed.push(item);
            }
        }
    }
    collapsed
}
