//! Session-aware, count-bounded store of captured calls.

use super::stored::{CallIndex, StoredCall};
use crate::body::{BodyCacheStats, BodyStore};
use crate::call::{NetworkCall, SessionChange, SessionKey, SessionTracker};
use crate::config::SettingsProvider;
use crate::metrics;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Call index and session tracker, guarded by one lock
struct CallStoreState {
    index: CallIndex,
    sessions: SessionTracker,
}

/// In-memory store of captured network calls
///
/// Call metadata is kept in insertion order and bounded by
/// `max_stored_calls`; bodies are delegated to a [`BodyStore`] with its own
/// byte budget and lock. Every read re-attaches the bodies ("hydrates" the
/// call), so a body evicted by the cache reads back as `None` while its call
/// is still listed.
///
/// A call whose app instance differs from the last one seen for its
/// (device, package) pair starts a new session: all calls of the previous
/// session are purged before the new call is inserted.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct NetworkCallStore {
    state: Arc<Mutex<CallStoreState>>,
    bodies: Arc<BodyStore>,
    settings: Arc<dyn SettingsProvider>,
    /// Bumped after every mutation; drives the observe_* streams
    changes: Arc<watch::Sender<u64>>,
}

impl NetworkCallStore {
    /// Create a store with its own body cache
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        let bodies = Arc::new(BodyStore::new(Arc::clone(&settings)));
        Self::with_body_store(settings, bodies)
    }

    /// Create a store on top of an existing body cache, which may be shared
    /// with other stores
    pub fn with_body_store(settings: Arc<dyn SettingsProvider>, bodies: Arc<BodyStore>) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(CallStoreState {
                index: CallIndex::new(),
                sessions: SessionTracker::new(),
            })),
            bodies,
            settings,
            changes: Arc::new(changes),
        }
    }

    /// The body cache backing this store
    pub fn body_store(&self) -> &Arc<BodyStore> {
        &self.bodies
    }

    /// Record a newly seen call.
    ///
    /// The call lands at the newest position; a call with the same id is
    /// replaced and moved there. Body writes happen while the index lock is
    /// held, so concurrent inserts around a session change are serialized and
    /// a purged session can never leave records behind.
    pub fn insert(&self, call: NetworkCall) {
        let max_stored_calls = self.settings.settings().max_stored_calls;
        let mut state = self.state.lock();

        let session = SessionKey::new(&call.device_id, &call.package_name);
        let change = state.sessions.observe(session, &call.app_instance);
        if let SessionChange::Replaced { previous } = change {
            let (device_id, package_name) = (&call.device_id, &call.package_name);
            let purged = state
                .index
                .remove_where(|stored| stored.call.belongs_to(device_id, package_name));
            for stored in &purged {
                self.bodies.remove_all(stored.call_id());
            }
            info!(
                "App {} on {} restarted ({} -> {}), purged {} calls",
                call.package_name,
                call.device_id,
                previous,
                call.app_instance,
                purged.len()
            );
            metrics::record_session_purge();
            metrics::record_call_evictions("session", purged.len());
        }

        debug!("Inserting call {}", call.call_id);
        let stored = StoredCall::strip(call, &self.bodies);
        state.index.push(stored);

        let mut evicted = 0;
        while state.index.len() > max_stored_calls {
            match state.index.pop_oldest() {
                Some(oldest) => {
                    self.bodies.remove_all(oldest.call_id());
                    evicted += 1;
                }
                None => break,
            }
        }
        if evicted > 0 {
            debug!(
                "Call store over capacity ({}), evicted {} oldest calls",
                max_stored_calls, evicted
            );
            metrics::record_call_evictions("capacity", evicted);
        }

        metrics::record_ingest("insert");
        metrics::set_stored_calls(state.index.len());
        drop(state);
        self.notify();
    }

    /// Replace a known call in place, e.g. once its response arrives.
    ///
    /// Unknown ids are ignored. The call keeps its insertion position, so an
    /// update does not protect it from count eviction.
    pub fn update(&self, call: NetworkCall) {
        let mut state = self.state.lock();
        if !state.index.contains(&call.call_id) {
            debug!("Ignoring update for unknown call {}", call.call_id);
            metrics::record_ingest("update_missing");
            return;
        }

        let stored = StoredCall::strip(call, &self.bodies);
        state.index.replace(stored);
        metrics::record_ingest("update");
        drop(state);
        self.notify();
    }

    pub fn get_by_call_id(&self, call_id: &str) -> Option<NetworkCall> {
        let stored = self.state.lock().index.get(call_id).cloned()?;
        Some(stored.hydrate(&self.bodies))
    }

    /// Calls of one app on one device, oldest first
    pub fn get_by_device_and_package(
        &self,
        device_id: &str,
        package_name: &str,
    ) -> Vec<NetworkCall> {
        let matching: Vec<StoredCall> = {
            let state = self.state.lock();
            state
                .index
                .iter()
                .filter(|stored| stored.call.belongs_to(device_id, package_name))
                .cloned()
                .collect()
        };
        self.hydrate_all(&matching)
    }

    /// Every stored call, oldest first
    pub fn all_calls(&self) -> Vec<NetworkCall> {
        let snapshot: Vec<StoredCall> = self.state.lock().index.iter().cloned().collect();
        self.hydrate_all(&snapshot)
    }

    /// Last app instance seen for a device and package
    pub fn current_app_instance(&self, device_id: &str, package_name: &str) -> Option<String> {
        let state = self.state.lock();
        state
            .sessions
            .current(&SessionKey::new(device_id, package_name))
            .map(str::to_string)
    }

    pub fn delete_by_call_id(&self, call_id: &str) {
        let mut state = self.state.lock();
        if state.index.remove(call_id).is_none() {
            return;
        }
        self.bodies.remove_all(call_id);
        self.after_delete(state);
    }

    pub fn delete_by_device_and_package(&self, device_id: &str, package_name: &str) {
        let mut state = self.state.lock();
        let removed = state
            .index
            .remove_where(|stored| stored.call.belongs_to(device_id, package_name));
        if removed.is_empty() {
            return;
        }
        for stored in &removed {
            self.bodies.remove_all(stored.call_id());
        }
        debug!(
            "Deleted {} calls of {} on {}",
            removed.len(),
            package_name,
            device_id
        );
        self.after_delete(state);
    }

    /// Remove every call of this store and its bodies. Session tracking is kept.
    ///
    /// Bodies are removed per call, so a body cache shared with another store
    /// keeps that store's bodies.
    pub fn delete_all(&self) {
        let mut state = self.state.lock();
        for stored in state.index.drain() {
            self.bodies.remove_all(stored.call_id());
        }
        self.after_delete(state);
    }

    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    pub fn body_stats(&self) -> BodyCacheStats {
        self.bodies.stats()
    }

    /// Live view of one call; emits the current value, then every change.
    pub fn observe_by_call_id(&self, call_id: &str) -> BoxStream<'static, Option<NetworkCall>> {
        let call_id = call_id.to_string();
        self.observe(move |store| store.get_by_call_id(&call_id))
    }

    /// Live view of the calls of one app on one device
    pub fn observe_by_device_and_package(
        &self,
        device_id: &str,
        package_name: &str,
    ) -> BoxStream<'static, Vec<NetworkCall>> {
        let device_id = device_id.to_string();
        let package_name = package_name.to_string();
        self.observe(move |store| store.get_by_device_and_package(&device_id, &package_name))
    }

    /// Live app instance of a device and package, only emitted when it changes
    pub fn observe_current_app_instance(
        &self,
        device_id: &str,
        package_name: &str,
    ) -> BoxStream<'static, Option<String>> {
        let device_id = device_id.to_string();
        let package_name = package_name.to_string();
        self.observe(move |store| store.current_app_instance(&device_id, &package_name))
    }

    /// Re-run `query` after every mutation, emitting only distinct results.
    fn observe<T, F>(&self, query: F) -> BoxStream<'static, T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&NetworkCallStore) -> T + Send + 'static,
    {
        let changes = self.changes.subscribe();
        stream::unfold(
            (self.clone(), changes, query, None::<T>),
            |(store, mut changes, query, last)| async move {
                loop {
                    if last.is_some() && changes.changed().await.is_err() {
                        return None;
                    }
                    changes.borrow_and_update();
                    let value = query(&store);
                    if last.as_ref() != Some(&value) {
                        return Some((value.clone(), (store, changes, query, Some(value))));
                    }
                }
            },
        )
        .boxed()
    }

    fn hydrate_all(&self, stored: &[StoredCall]) -> Vec<NetworkCall> {
        stored
            .iter()
            .map(|stored| stored.hydrate(&self.bodies))
            .collect()
    }

    fn after_delete(&self, state: MutexGuard<'_, CallStoreState>) {
        metrics::set_stored_calls(state.index.len());
        drop(state);
        self.notify();
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }
}
