//! Peer identity, liveness records, and the group-survey rules.
//!
//! Every running operator writes a record `{priority, expiry}` under its
//! own id into a store shared by the peering group. A peer freezes itself
//! while any *other* unexpired record carries a strictly higher priority.
//! Equal priorities never freeze anyone; they are a conflict to warn about.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PeeringError;
use crate::store::PeerStore;

/// Stable identity of one running operator within a peering group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Best-effort unique identity for this process:
/// `{user}@{host}/{started-at}/{pid}`.
///
/// Call once at startup and reuse the value; every call captures a fresh
/// timestamp.
#[must_use]
pub fn detect_own_id() -> PeerId {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "anonymous".to_owned());
    let host = hostname::get()
        .map(|host| host.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    let started = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f");
    let pid = std::process::id();
    PeerId(format!("{user}@{host}/{started}/{pid}"))
}

/// The store scope one peering group shares: group name plus namespace,
/// with `None` for cluster-wide groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerScope {
    pub name: String,
    pub namespace: Option<String>,
}

impl PeerScope {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: Option<String>) -> Self {
        Self {
            name: name.into(),
            namespace,
        }
    }

    #[must_use]
    pub fn cluster_wide(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }
}

impl std::fmt::Display for PeerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One liveness record as persisted in the shared store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub priority: i64,
    pub expiry: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PeerRecord {
    /// A record at or past its expiry no longer counts for anything:
    /// peers that stop refreshing heal out of the group by time alone.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}

/// One running operator in a peering group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: PeerId,
    /// Peering group name.
    pub name: String,
    /// Namespace of the group, `None` for cluster-wide peering.
    pub namespace: Option<String>,
    pub priority: i64,
    /// How long one written record stays valid without a refresh.
    pub lifetime: Duration,
    /// Optional free-text shown to other peers, e.g. a freeze reason.
    pub message: Option<String>,
}

impl Peer {
    pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60);
    pub const DEFAULT_PRIORITY: i64 = 0;
    /// Conventional priority for an imposed freeze, above any regular peer.
    pub const DEFAULT_FREEZE_PRIORITY: i64 = 100;

    #[must_use]
    pub fn new(id: PeerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            namespace: None,
            priority: Self::DEFAULT_PRIORITY,
            lifetime: Self::DEFAULT_LIFETIME,
            message: None,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn scope(&self) -> PeerScope {
        PeerScope::new(self.name.clone(), self.namespace.clone())
    }

    /// The record one heartbeat write persists: valid for `lifetime` from `now`.
    #[must_use]
    pub fn record(&self, now: DateTime<Utc>) -> PeerRecord {
        let millis = i64::try_from(self.lifetime.as_millis()).unwrap_or(i64::MAX);
        PeerRecord {
            priority: self.priority,
            expiry: now + chrono::Duration::milliseconds(millis),
            message: self.message.clone(),
        }
    }

    /// Write or refresh this peer's record once.
    pub async fn touch(&self, store: &dyn PeerStore) -> Result<(), PeeringError> {
        let record = self.record(Utc::now());
        store.put(&self.scope(), &self.id, record).await
    }

    /// Remove this peer's record, ceding its place immediately instead of
    /// waiting for expiry.
    pub async fn disappear(&self, store: &dyn PeerStore) -> Result<(), PeeringError> {
        store.remove(&self.scope(), &self.id).await
    }
}

/// True when any live record besides our own carries a strictly higher
/// priority.
#[must_use]
pub fn is_outranked(own: &Peer, records: &HashMap<PeerId, PeerRecord>, now: DateTime<Utc>) -> bool {
    records.iter().any(|(id, record)| {
        *id != own.id && !record.is_expired(now) && record.priority > own.priority
    })
}

/// How many live records besides our own carry exactly our priority.
#[must_use]
pub fn same_priority_rivals(
    own: &Peer,
    records: &HashMap<PeerId, PeerRecord>,
    now: DateTime<Utc>,
) -> usize {
    records
        .iter()
        .filter(|(id, record)| {
            **id != own.id && !record.is_expired(now) && record.priority == own.priority
        })
        .count()
}
