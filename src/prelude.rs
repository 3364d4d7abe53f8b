//! Prelude module - common imports for embedding reeve
//!
//! Import this module to get all common types and traits:
//! ```rust
//! use reeve::prelude::*;
//! ```

// Re-export error types
pub use reeve_events::ReportError;
pub use reeve_peering::PeeringError;
pub use reeve_registry::RegistryError;

// Re-export object and diff model types
pub use reeve_core::{Body, Diff, DiffItem, DiffOperation, FieldPath, Resource};

// Re-export registration and lookup types
pub use reeve_registry::{
    ActionFailure, ActionResult, Activity, ActivityCause, ActivityFn, ChangingFn, ErrorsMode,
    HandlerId, HandlerIdSet, HandlerOptions, MetaFilter, OperatorRegistry, Reason,
    ResourceChangingCause, ResourceSpawningCause, ResourceWatchingCause, SpawningFn, SubRegistry,
    WatchEventType, WatchingFn,
};

// Re-export peer coordination types
pub use reeve_peering::{
    detect_own_id, InMemoryPeerStore, Keepalive, KeepaliveConfig, KeepaliveHandle, Peer, PeerId,
    PeerState, PeerStore,
};

// Re-export event reporting types
pub use reeve_events::{
    EventReporter, EventSink, EventType, ObjectEvent, ObjectRef, RecordingEventSink,
    TracingEventSink,
};
