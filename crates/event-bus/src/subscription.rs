use std::sync::{Mutex, Weak};

use crate::bus::{ListenerId, Registry, lock};

/// Handle to a registration on the [`EventBus`](crate::EventBus).
///
/// Dropping the handle removes the registration. It holds only a weak
/// reference, so it never keeps the bus alive.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    key: String,
    id: ListenerId,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(registry: Weak<Mutex<Registry>>, key: String, id: ListenerId) -> Self {
        Self {
            registry,
            key,
            id,
            active: true,
        }
    }

    /// Event key this subscription listens on.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the registration now. Returns `false` if it was already gone.
    pub fn unsubscribe(mut self) -> bool {
        self.active = false;
        self.remove()
    }

    /// Keeps the registration alive past this handle.
    ///
    /// The returned id can still be passed to
    /// [`EventBus::unsubscribe`](crate::EventBus::unsubscribe).
    pub fn detach(mut self) -> ListenerId {
        self.active = false;
        self.id
    }

    fn remove(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).remove(&self.key, self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.active {
            self.remove();
        }
    }
}
