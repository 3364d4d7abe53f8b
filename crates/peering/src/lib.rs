//! Peer coordination for reeve operators.
//!
//! Several operator instances may serve the same resources at once, during
//! rolling upgrades or debugging sessions. Peering keeps them from fighting:
//!
//! - **Peers** publish keepalive records with a priority and an expiry
//! - **Keepalives** refresh the record and survey the rest of the group
//! - **Freezing** pauses any peer that sees a live higher-priority record
//! - **Resuming** happens when the higher record expires or is removed
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use reeve_peering::{detect_own_id, InMemoryPeerStore, Keepalive, Peer};
//!
//! let store = Arc::new(InMemoryPeerStore::new());
//! let peer = Peer::new(detect_own_id(), "ops")
//!     .with_priority(10)
//!     .with_lifetime(Duration::from_secs(60));
//! let handle = Keepalive::new(peer, store).start()?;
//!
//! // ... dispatch work only while !handle.is_frozen() ...
//!
//! handle.shutdown().await;
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod error;
pub mod keepalive;
pub mod peer;
pub mod store;

// Re-export main types
pub use error::PeeringError;
pub use keepalive::{freeze, resume, Keepalive, KeepaliveConfig, KeepaliveHandle, PeerState};
pub use peer::{detect_own_id, is_outranked, same_priority_rivals, Peer, PeerId, PeerRecord, PeerScope};
pub use store::{InMemoryPeerStore, PeerStore};
