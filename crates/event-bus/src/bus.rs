use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::trace;

use crate::stream::EventStream;
use crate::subscription::Subscription;

/// Listener callback. Receives the notification payload.
pub type Callback = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Identifies one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: u64,
    listeners: HashMap<String, Vec<Registration>>,
}

impl Registry {
    fn insert(&mut self, key: String, callback: Callback) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners
            .entry(key)
            .or_default()
            .push(Registration { id, callback });
        id
    }

    /// Removes the first registration under `key` matching `pred`.
    fn remove_first(&mut self, key: &str, pred: impl Fn(&Registration) -> bool) -> bool {
        let Some(list) = self.listeners.get_mut(key) else {
            return false;
        };
        let Some(pos) = list.iter().position(pred) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.listeners.remove(key);
        }
        true
    }

    pub(crate) fn remove(&mut self, key: &str, id: ListenerId) -> bool {
        self.remove_first(key, |r| r.id == id)
    }
}

pub(crate) fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Callbacks never run under the lock, so a poisoned registry is still
    // consistent.
    registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publish/subscribe registry keyed by event name.
///
/// Cloning is cheap and yields a handle to the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under `key`.
    ///
    /// The registration lives until the returned [`Subscription`] is dropped
    /// (or [`detached`](Subscription::detach)).
    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.subscribe_callback(key, Arc::new(callback))
    }

    /// Registers a shared callback under `key`.
    ///
    /// The same callback may be registered more than once; each registration
    /// is invoked separately.
    pub fn subscribe_callback(&self, key: impl Into<String>, callback: Callback) -> Subscription {
        let key = key.into();
        let id = lock(&self.registry).insert(key.clone(), callback);
        trace!(key = %key, ?id, "listener registered");
        Subscription::new(Arc::downgrade(&self.registry), key, id)
    }

    /// Returns a stream of payloads published under `key`.
    pub fn stream(&self, key: impl Into<String>) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(key, move |payload| {
            let _ = tx.send(payload.clone());
        });
        EventStream::new(rx, subscription)
    }

    /// Removes the registration `id` under `key`.
    pub fn unsubscribe(&self, key: &str, id: ListenerId) -> bool {
        lock(&self.registry).remove(key, id)
    }

    /// Removes exactly one registration of `callback` under `key`, the
    /// earliest one.
    pub fn unsubscribe_callback(&self, key: &str, callback: &Callback) -> bool {
        lock(&self.registry).remove_first(key, |r| Arc::ptr_eq(&r.callback, callback))
    }

    /// Invokes every callback registered under `key`, in registration order.
    ///
    /// Callbacks run on the caller's task after the registry lock has been
    /// released, so they may subscribe or unsubscribe freely. The set of
    /// callbacks is fixed when `publish` starts. A panicking callback unwinds
    /// into the caller. Returns the number of callbacks invoked.
    pub fn publish(&self, key: &str, payload: &serde_json::Value) -> usize {
        let callbacks: Vec<Callback> = match lock(&self.registry).listeners.get(key) {
            Some(list) => list.iter().map(|r| Arc::clone(&r.callback)).collect(),
            None => Vec::new(),
        };

        trace!(key, listeners = callbacks.len(), "publishing event");
        for callback in &callbacks {
            callback(payload);
        }
        callbacks.len()
    }

    /// Number of registrations under `key`.
    pub fn listener_count(&self, key: &str) -> usize {
        lock(&self.registry)
            .listeners
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Keys with at least one registration, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.registry).listeners.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = lock(&self.registry);
        let mut map = f.debug_map();
        for (key, list) in &registry.listeners {
            map.entry(key, &list.len());
        }
        map.finish()
    }
}
