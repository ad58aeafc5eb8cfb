//! Ordered listener registry with panic-isolated fan-out.

use crate::types::ListenerId;
use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Holds callbacks of one kind in registration order.
///
/// Emission works on a cloned list so callbacks run with no lock held and may
/// register or remove listeners (including themselves) while being invoked.
pub struct ListenerRegistry<F: ?Sized> {
    /// Registered listeners, oldest first.
    listeners: RwLock<Vec<(ListenerId, Arc<F>)>>,
    /// Counter for generating listener IDs.
    next_id: AtomicU64,
}

impl<F: ?Sized> ListenerRegistry<F> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener and return its id.
    pub fn add(&self, listener: Arc<F>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|(lid, _)| *lid == id) {
            Some(pos) => {
                listeners.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Copy of the current listeners, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<F>> {
        self.listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    /// Invoke `call` for every listener, isolating panics.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns the number of listeners that panicked.
    pub fn emit<C>(&self, context: &'static str, call: C) -> usize
    where
        C: Fn(&F),
    {
        let mut panicked = 0;
        for listener in self.snapshot() {
            if catch_unwind(AssertUnwindSafe(|| call(&*listener))).is_err() {
                panicked += 1;
                tracing::warn!(context, "listener panicked; continuing fan-out");
            }
        }
        panicked
    }
}

impl<F: ?Sized> Default for ListenerRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}
