//! The shared record store every peer of a group reads and writes.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::PeeringError;
use crate::peer::{PeerId, PeerRecord, PeerScope};

/// Storage visible to every peer of a group, keyed by scope then peer id.
///
/// Cluster deployments back this with a shared object (for example an
/// annotation-carrying resource); tests and single-process embeddings use
/// [`InMemoryPeerStore`].
#[async_trait]
pub trait PeerStore: Send + Sync {
    /// Write or overwrite one peer's record.
    async fn put(
        &self,
        scope: &PeerScope,
        id: &PeerId,
        record: PeerRecord,
    ) -> Result<(), PeeringError>;

    /// Remove one peer's record. Removing an absent record is not an error.
    async fn remove(&self, scope: &PeerScope, id: &PeerId) -> Result<(), PeeringError>;

    /// All records currently present for the scope, expired ones included.
    async fn list(&self, scope: &PeerScope) -> Result<HashMap<PeerId, PeerRecord>, PeeringError>;
}

/// Process-local store for tests and single-process embeddings.
#[derive(Debug, Default)]
pub struct InMemoryPeerStore {
    records: RwLock<HashMap<PeerScope, HashMap<PeerId, PeerRecord>>>,
}

impl InMemoryPeerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PeerStore for InMemoryPeerStore {
    async fn put(
        &self,
        scope: &PeerScope,
        id: &PeerId,
        record: PeerRecord,
    ) -> Result<(), PeeringError> {
        let mut records = self.records.write().await;
        records
            .entry(scope.clone())
            .or_default()
            .insert(id.clone(), record);
        Ok(())
    }

    async fn remove(&self, scope: &PeerScope, id: &PeerId) -> Result<(), PeeringError> {
        let mut records = self.records.write().await;
        if let Some(scoped) = records.get_mut(scope) {
            scoped.remove(id);
            if scoped.is_empty() {
                records.remove(scope);
            }
        }
        Ok(())
    }

    async fn list(&self, scope: &PeerScope) -> Result<HashMap<PeerId, PeerRecord>, PeeringError> {
        let records = self.records.read().await;
        Ok(records.get(scope).cloned().unwrap_or_default())
    }
}
