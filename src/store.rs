use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, RwLock,
};

use crate::models::NavigationState;
use crate::settings::ResetPreserve;
use crate::utils::sync::{lock, read, write};

/// Receives every published snapshot.
///
/// Called on the writer's thread right after the swap. Implementations must
/// not block and must not call [`StateStore::update`] from inside the
/// callback; schedule a task instead.
pub trait StateListener: Send + Sync {
    fn on_state_updated(&self, state: &NavigationState);
}

impl<F> StateListener for F
where
    F: Fn(&NavigationState) + Send + Sync,
{
    fn on_state_updated(&self, state: &NavigationState) {
        self(state)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct StoreInner {
    current: RwLock<Arc<NavigationState>>,
    writer: Mutex<()>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn StateListener>)>>,
    next_listener: AtomicU64,
}

/// Holder of the canonical navigation snapshot.
///
/// Writers serialize on one mutex and publish by swapping an `Arc`; readers
/// only ever wait for that swap.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<StoreInner>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(Arc::new(NavigationState::default())),
                writer: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                next_listener: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> Arc<NavigationState> {
        Arc::clone(&read(&self.inner.current))
    }

    /// Apply `updater` to the current snapshot and publish the result.
    pub fn update<F>(&self, updater: F) -> Arc<NavigationState>
    where
        F: FnOnce(&NavigationState) -> NavigationState,
    {
        let _writer = lock(&self.inner.writer);
        let current = self.snapshot();
        let updated = Arc::new(updater(&current));
        *write(&self.inner.current) = Arc::clone(&updated);
        // Still under the writer lock so listeners see revisions in order.
        self.notify(&updated);
        updated
    }

    pub fn reset(&self, last_action: &str, timestamp: i64, preserve: ResetPreserve) -> Arc<NavigationState> {
        self.update(|state| state.reset(last_action, timestamp, preserve))
    }

    /// Register `listener` and immediately hand it the current snapshot.
    pub fn subscribe(&self, listener: Arc<dyn StateListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.inner.listeners).push((id, Arc::clone(&listener)));
        listener.on_state_updated(&self.snapshot());
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.inner.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, state: &NavigationState) {
        let listeners: Vec<Arc<dyn StateListener>> = lock(&self.inner.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_state_updated(state);
        }
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
