//! The heartbeat loop: refresh our own record, survey the group, and flip
//! the freeze state accordingly.
//!
//! An imposed freeze is nothing special: it is a keepalive for a peer with
//! an operator-chosen high priority (see [`freeze`]). Resuming early means
//! removing that peer's record (see [`resume`]) instead of waiting for its
//! expiry to lapse.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::PeeringError;
use crate::peer::{is_outranked, same_priority_rivals, Peer};
use crate::store::PeerStore;

/// Observable position of this peer within its group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Reconciliation may proceed.
    Active,
    /// A higher-priority peer is live; reconciliation must pause.
    Frozen,
    /// The keepalive has stopped and the record was removed.
    Gone,
}

impl PeerState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Gone => "gone",
        }
    }
}

impl std::fmt::Display for PeerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Heartbeat cadence configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeepaliveConfig {
    /// Time between heartbeats; `None` derives half the peer's lifetime,
    /// so a record is always refreshed well before it expires.
    pub interval: Option<Duration>,
}

impl KeepaliveConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Configuration for tests: a tight cadence so tests run in milliseconds.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            interval: Some(Duration::from_millis(25)),
        }
    }

    fn effective_interval(&self, lifetime: Duration) -> Duration {
        self.interval.unwrap_or(lifetime / 2)
    }
}

/// Runs one peer's heartbeat until stopped, then removes the record.
pub struct Keepalive {
    peer: Peer,
    store: Arc<dyn PeerStore>,
    config: KeepaliveConfig,
}

impl Keepalive {
    #[must_use]
    pub fn new(peer: Peer, store: Arc<dyn PeerStore>) -> Self {
        Self {
            peer,
            store,
            config: KeepaliveConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: KeepaliveConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn the heartbeat loop.
    ///
    /// The returned handle owns the stop signal and the observable state.
    /// The interval must be shorter than the peer's lifetime, or the peer
    /// would flicker out of the group between its own heartbeats.
    pub fn start(self) -> Result<KeepaliveHandle, PeeringError> {
        if self.peer.lifetime.is_zero() {
            return Err(PeeringError::invalid_config("peer lifetime must be non-zero"));
        }
        let interval = self.config.effective_interval(self.peer.lifetime);
        if interval.is_zero() {
            return Err(PeeringError::invalid_config("heartbeat interval must be non-zero"));
        }
        if interval >= self.peer.lifetime {
            return Err(PeeringError::invalid_config(
                "heartbeat interval must be shorter than the peer lifetime",
            ));
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(PeerState::Active);
        let task = tokio::spawn(run_keepalive(self.peer, self.store, interval, stop_rx, state_tx));
        Ok(KeepaliveHandle {
            stop_tx,
            state_rx,
            task,
        })
    }
}

/// Control half of a running keepalive.
#[derive(Debug)]
pub struct KeepaliveHandle {
    stop_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<PeerState>,
    task: JoinHandle<()>,
}

impl KeepaliveHandle {
    /// The current freeze state; consulted by the reconciliation driver
    /// before each dispatch.
    #[must_use]
    pub fn state(&self) -> PeerState {
        *self.state_rx.borrow()
    }

    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state() == PeerState::Frozen
    }

    /// A receiver to await state transitions on.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<PeerState> {
        self.state_rx.clone()
    }

    /// Ask the loop to stop; it removes the peer's record on the way out.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait until the record removal has finished.
    pub async fn shutdown(self) {
        self.stop();
        let _ = self.task.await;
    }
}

/// Announce a high-priority peer and keep the group frozen until the
/// returned handle is stopped.
pub fn freeze(peer: Peer, store: Arc<dyn PeerStore>) -> Result<KeepaliveHandle, PeeringError> {
    Keepalive::new(peer, store).start()
}

/// Lift a peer's claim immediately so the group resumes without waiting
/// for the record to expire.
pub async fn resume(peer: &Peer, store: &dyn PeerStore) -> Result<(), PeeringError> {
    peer.disappear(store).await
}

async fn run_keepalive(
    peer: Peer,
    store: Arc<dyn PeerStore>,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
    state_tx: watch::Sender<PeerState>,
) {
    let scope = peer.scope();
    let mut ticker = tokio::time::interval(interval);
    let mut warned_rivals = false;

    debug!(peer = %peer.id, scope = %scope, interval_ms = interval.as_millis() as u64, "Keepalive started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = peer.touch(store.as_ref()).await {
                    warn!(peer = %peer.id, %error, "Heartbeat write failed; retrying next tick");
                }
                match store.list(&scope).await {
                    Ok(records) => {
                        let now = Utc::now();
                        let next = if is_outranked(&peer, &records, now) {
                            PeerState::Frozen
                        } else {
                            PeerState::Active
                        };
                        let changed = state_tx.send_if_modified(|state| {
                            if *state == next {
                                false
                            } else {
                                *state = next;
                                true
                            }
                        });
                        if changed {
                            match next {
                                PeerState::Frozen => info!(
                                    peer = %peer.id,
                                    priority = peer.priority,
                                    "Freezing: a higher-priority peer is active"
                                ),
                                PeerState::Active => info!(
                                    peer = %peer.id,
                                    "Resuming: no higher-priority peers remain"
                                ),
                                PeerState::Gone => {}
                            }
                        }

                        let rivals = same_priority_rivals(&peer, &records, now);
                        if rivals > 0 && !warned_rivals {
                            warn!(
                                peer = %peer.id,
                                priority = peer.priority,
                                rivals,
                                "Peers with the same priority detected; possibly conflicting operators"
                            );
                        }
                        warned_rivals = rivals > 0;
                    }
                    Err(error) => {
                        warn!(peer = %peer.id, %error, "Peer survey failed; retrying next tick");
                    }
                }
            }
            changed = stop_rx.changed() => {
                match changed {
                    Ok(()) if *stop_rx.borrow() => break,
                    Ok(()) => {}
                    Err(_) => break,
                }
            }
        }
    }

    if let Err(error) = peer.disappear(store.as_ref()).await {
        warn!(peer = %peer.id, %error, "Could not remove own record; it expires on its own");
    }
    let _ = state_tx.send(PeerState::Gone);
    debug!(peer = %peer.id, "Keepalive stopped");
}
