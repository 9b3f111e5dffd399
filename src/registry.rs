//! Connection registry.
//!
//! Maps every open connection to its negotiation state and outbound sink.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Registry                    │
//! │            (one mutex, one map)             │
//! │  ┌───────────────────────────────────────┐  │
//! │  │ PeerId=a → { offer, answer, target }  │  │
//! │  │ PeerId=b → { offer, answer, target }  │  │
//! │  └───────────────────────────────────────┘  │
//! │                    │ on_commit(&Snapshot)   │
//! └────────────────────┼────────────────────────┘
//!                      ▼
//!              MutationObserver (Broadcaster)
//! ```
//!
//! Every mutating operation commits under the lock, captures a [`Snapshot`],
//! and hands it to the observer before releasing the lock. Observers therefore
//! see commits in exactly the order they were applied.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::identifiers::PeerId;
use crate::protocol::NegotiationUpdate;
use crate::transport::PeerSink;

// ============================================================================
// Types
// ============================================================================

type PeerMap = FxHashMap<PeerId, PeerRecord>;

/// Hook invoked after every committed registry mutation.
///
/// Runs while the registry lock is held and must not call back into the
/// registry.
pub trait MutationObserver: Send + Sync {
    /// Called with the state as of the mutation just committed.
    fn on_commit(&self, snapshot: &Snapshot);
}

/// A negotiation field that can be set on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Session-description offer.
    Offer,
    /// Session-description answer.
    Answer,
    /// Negotiation target.
    Target,
}

// ============================================================================
// PeerState
// ============================================================================

/// Negotiation state of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerState {
    /// Connection identifier.
    pub id: PeerId,
    /// Last offer, empty until set.
    pub offer: String,
    /// Last answer, empty until set.
    pub answer: String,
    /// Negotiation target, empty until set.
    pub target: String,
}

impl PeerState {
    /// Creates a state with empty negotiation fields.
    #[inline]
    #[must_use]
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            offer: String::new(),
            answer: String::new(),
            target: String::new(),
        }
    }

    /// Sets one field.
    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Offer => self.offer = value,
            Field::Answer => self.answer = value,
            Field::Target => self.target = value,
        }
    }

    /// Applies every field present in `update`.
    pub fn apply(&mut self, update: NegotiationUpdate) {
        let NegotiationUpdate {
            offer,
            answer,
            target,
        } = update;

        if let Some(offer) = offer {
            self.set(Field::Offer, offer);
        }
        if let Some(answer) = answer {
            self.set(Field::Answer, answer);
        }
        if let Some(target) = target {
            self.set(Field::Target, target);
        }
    }
}

struct PeerRecord {
    state: PeerState,
    sink: PeerSink,
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable copy of the registry at one commit.
///
/// Entries are ordered by [`PeerId`].
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    peers: Vec<PeerState>,
    recipients: Vec<PeerSink>,
}

impl Snapshot {
    fn capture(map: &PeerMap) -> Self {
        let mut records: Vec<&PeerRecord> = map.values().collect();
        records.sort_unstable_by_key(|record| record.state.id);

        Self {
            peers: records.iter().map(|r| r.state.clone()).collect(),
            recipients: records.iter().map(|r| r.sink.clone()).collect(),
        }
    }

    /// Returns the state of every open connection.
    #[inline]
    #[must_use]
    pub fn peers(&self) -> &[PeerState] {
        &self.peers
    }

    /// Returns the sink of every open connection.
    #[inline]
    #[must_use]
    pub fn recipients(&self) -> &[PeerSink] {
        &self.recipients
    }

    /// Returns the identifier of every open connection.
    pub fn ids(&self) -> impl Iterator<Item = PeerId> + '_ {
        self.peers.iter().map(|p| p.id)
    }

    /// Looks up one connection's state.
    #[must_use]
    pub fn get(&self, id: PeerId) -> Option<&PeerState> {
        self.peers.iter().find(|p| p.id == id)
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Returns `true` if no connection is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Process-wide table of open connections.
///
/// Thread-safe; all operations serialize on a single lock.
///
/// # Example
///
/// ```ignore
/// let registry = Registry::with_observer(Arc::new(Broadcaster::new(mode)));
/// registry.register(id, sink);
/// registry.update(id, NegotiationUpdate::default().with_offer(sdp));
/// registry.unregister(id);
/// ```
#[derive(Default)]
pub struct Registry {
    peers: Mutex<PeerMap>,
    observer: Option<Arc<dyn MutationObserver>>,
    /// Set by [`Registry::disconnect_all`]. Only read or written under the `peers` lock.
    closing: AtomicBool,
}

impl Registry {
    /// Creates an empty registry with no observer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry that notifies `observer` after every mutation.
    #[must_use]
    pub fn with_observer(observer: Arc<dyn MutationObserver>) -> Self {
        Self {
            peers: Mutex::new(PeerMap::default()),
            observer: Some(observer),
            closing: AtomicBool::new(false),
        }
    }

    /// Adds a connection with empty negotiation fields.
    ///
    /// Identifiers are unique per connection; a duplicate replaces the
    /// previous record. After [`Registry::disconnect_all`] the new
    /// connection is asked to close straight away.
    pub fn register(&self, id: PeerId, sink: PeerSink) {
        self.commit(|peers| {
            if self.closing.load(Ordering::Relaxed) {
                debug!(peer_id = %id, "Registered while closing, disconnecting");
                sink.close();
            }
            let record = PeerRecord {
                state: PeerState::new(id),
                sink,
            };
            if peers.insert(id, record).is_some() {
                warn!(peer_id = %id, "Duplicate registration replaced existing record");
            }
            debug!(peer_id = %id, peers = peers.len(), "Peer registered");
        });
    }

    /// Removes a connection.
    ///
    /// Returns `true` if it was present. Absent identifiers are a no-op but
    /// still notify the observer.
    pub fn unregister(&self, id: PeerId) -> bool {
        self.commit(|peers| {
            let removed = peers.remove(&id).is_some();
            debug!(peer_id = %id, removed, peers = peers.len(), "Peer unregistered");
            removed
        })
    }

    /// Sets one negotiation field.
    ///
    /// Returns `true` if the connection was present.
    pub fn update_field(&self, id: PeerId, field: Field, value: impl Into<String>) -> bool {
        let value = value.into();
        self.commit(|peers| match peers.get_mut(&id) {
            Some(record) => {
                record.state.set(field, value);
                true
            }
            None => false,
        })
    }

    /// Applies every field present in `update` as one commit.
    ///
    /// Returns `true` if the connection was present. Stale identifiers are
    /// ignored.
    pub fn update(&self, id: PeerId, update: NegotiationUpdate) -> bool {
        self.commit(|peers| match peers.get_mut(&id) {
            Some(record) => {
                record.state.apply(update);
                true
            }
            None => {
                debug!(peer_id = %id, "Update for unknown peer ignored");
                false
            }
        })
    }

    /// Returns a consistent copy of the whole table.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.peers.lock())
    }

    /// Returns the number of open connections.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    /// Returns `true` if no connection is open.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    /// Returns `true` if `id` is open.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: PeerId) -> bool {
        self.peers.lock().contains_key(&id)
    }

    /// Returns every open connection's identifier, in [`PeerId`] order.
    #[must_use]
    pub fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Asks every open connection to close, including any registered later.
    ///
    /// Records are removed as each connection task ends.
    pub fn disconnect_all(&self) {
        let peers = self.peers.lock();
        self.closing.store(true, Ordering::Relaxed);
        for record in peers.values() {
            record.sink.close();
        }
        debug!(peers = peers.len(), "Disconnect requested for all peers");
    }

    /// Applies `mutate` and notifies the observer under one lock.
    fn commit<R>(&self, mutate: impl FnOnce(&mut PeerMap) -> R) -> R {
        let mut peers = self.peers.lock();
        let outcome = mutate(&mut peers);

        if let Some(observer) = &self.observer {
            observer.on_commit(&Snapshot::capture(&peers));
        }

        outcome
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use proptest::prelude::*;

    /// Records the peer-id set of every snapshot it sees.
    #[derive(Default)]
    struct Recorder {
        commits: Mutex<Vec<Vec<PeerState>>>,
    }

    impl MutationObserver for Recorder {
        fn on_commit(&self, snapshot: &Snapshot) {
            self.commits.lock().push(snapshot.peers().to_vec());
        }
    }

    fn recorded() -> (Arc<Recorder>, Registry) {
        let recorder = Arc::new(Recorder::default());
        let registry = Registry::with_observer(recorder.clone());
        (recorder, registry)
    }

    fn sink(id: PeerId) -> PeerSink {
        PeerSink::channel(id).0
    }

    #[test]
    fn test_register_adds_empty_record() {
        let (recorder, registry) = recorded();
        let id = PeerId::generate();

        registry.register(id, sink(id));

        assert!(registry.contains(id));
        assert_eq!(registry.snapshot().get(id), Some(&PeerState::new(id)));
        assert_eq!(recorder.commits.lock().len(), 1);
    }

    #[test]
    fn test_unregister_removes_and_notifies() {
        let (recorder, registry) = recorded();
        let id = PeerId::generate();

        registry.register(id, sink(id));
        assert!(registry.unregister(id));

        assert!(registry.is_empty());
        let commits = recorder.commits.lock();
        assert_eq!(commits.len(), 2);
        assert!(commits[1].is_empty());
    }

    #[test]
    fn test_unregister_twice_is_idempotent() {
        let (recorder, registry) = recorded();
        let id = PeerId::generate();

        registry.register(id, sink(id));
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));

        assert!(registry.is_empty());
        assert_eq!(recorder.commits.lock().len(), 3);
    }

    #[test]
    fn test_update_field_sets_only_that_field() {
        let registry = Registry::new();
        let id = PeerId::generate();
        registry.register(id, sink(id));

        assert!(registry.update_field(id, Field::Offer, "X"));

        let snapshot = registry.snapshot();
        let state = snapshot.get(id).expect("registered");
        assert_eq!(state.offer, "X");
        assert_eq!(state.answer, "");
        assert_eq!(state.target, "");
    }

    #[test]
    fn test_update_applies_present_fields() {
        let registry = Registry::new();
        let id = PeerId::generate();
        registry.register(id, sink(id));
        registry.update_field(id, Field::Offer, "old");

        let applied = registry.update(
            id,
            NegotiationUpdate::default()
                .with_answer("a")
                .with_target("peer-2"),
        );

        assert!(applied);
        let snapshot = registry.snapshot();
        let state = snapshot.get(id).expect("registered");
        assert_eq!(state.offer, "old");
        assert_eq!(state.answer, "a");
        assert_eq!(state.target, "peer-2");
    }

    #[test]
    fn test_update_unknown_peer_is_ignored() {
        let (recorder, registry) = recorded();
        let id = PeerId::generate();

        assert!(!registry.update(id, NegotiationUpdate::default().with_offer("X")));
        assert!(!registry.update_field(id, Field::Answer, "Y"));

        assert!(registry.is_empty());
        assert_eq!(recorder.commits.lock().len(), 2);
    }

    #[test]
    fn test_observer_sees_committed_state() {
        let (recorder, registry) = recorded();
        let id = PeerId::generate();

        registry.register(id, sink(id));
        registry.update_field(id, Field::Offer, "X");

        let commits = recorder.commits.lock();
        assert_eq!(commits[1][0].offer, "X");
    }

    #[test]
    fn test_snapshot_is_sorted_and_detached() {
        let registry = Registry::new();
        let ids: Vec<PeerId> = (0..5).map(|_| PeerId::generate()).collect();
        for &id in &ids {
            registry.register(id, sink(id));
        }

        let snapshot = registry.snapshot();
        registry.unregister(ids[0]);

        let mut expected = ids.clone();
        expected.sort();
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), expected);
        assert_eq!(snapshot.recipients().len(), 5);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_after_disconnect_all_queues_close() {
        let registry = Registry::new();
        registry.disconnect_all();

        let id = PeerId::generate();
        let (peer_sink, mut outbox) = PeerSink::channel(id);
        registry.register(id, peer_sink);

        assert!(registry.contains(id));
        assert!(matches!(
            outbox.try_recv(),
            Some(crate::transport::Outgoing::Close)
        ));
    }

    #[test]
    fn test_ids_are_sorted() {
        let registry = Registry::new();
        assert!(registry.ids().is_empty());

        let mut ids: Vec<PeerId> = (0..5).map(|_| PeerId::generate()).collect();
        for &id in &ids {
            registry.register(id, sink(id));
        }
        registry.unregister(ids[2]);
        ids.remove(2);
        ids.sort();

        assert_eq!(registry.ids(), ids);
        assert_eq!(registry.ids(), registry.snapshot().ids().collect::<Vec<_>>());
    }

    #[test]
    fn test_disconnect_all_queues_close() {
        let registry = Registry::new();
        let id = PeerId::generate();
        let (peer_sink, mut outbox) = PeerSink::channel(id);
        registry.register(id, peer_sink);

        registry.disconnect_all();

        let item = outbox.try_recv();
        assert_eq!(item, Some(crate::transport::Outgoing::Close));
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let mut ids = Vec::new();
                    for _ in 0..50 {
                        let id = PeerId::generate();
                        registry.register(id, sink(id));
                        ids.push(id);
                    }
                    for id in ids.iter().step_by(2) {
                        registry.unregister(*id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread");
        }

        assert_eq!(registry.len(), 8 * 25);
    }

    proptest! {
        #[test]
        fn test_key_set_matches_model(
            ops in prop::collection::vec((any::<bool>(), 0usize..6), 0..64)
        ) {
            let pool: Vec<PeerId> = (0..6).map(|_| PeerId::generate()).collect();
            let registry = Registry::new();
            let mut model = HashSet::new();

            for (register, index) in ops {
                let id = pool[index];
                if register {
                    if model.insert(id) {
                        registry.register(id, sink(id));
                    }
                } else {
                    registry.unregister(id);
                    model.remove(&id);
                }
            }

            let actual: HashSet<PeerId> = registry.snapshot().ids().collect();
            prop_assert_eq!(actual, model);
        }
    }
}
