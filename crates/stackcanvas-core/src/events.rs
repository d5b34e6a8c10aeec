//! Typed publish/subscribe for state-machine notifications.
//!
//! Handlers are called synchronously, in registration order. A panicking
//! handler is logged and skipped; later handlers still receive the event.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listeners<E> {
    next_id: u64,
    entries: Vec<(u64, Handler<E>)>,
}

/// A list of event handlers shared by every clone of the bus.
pub struct EventBus<E> {
    listeners: Arc<Mutex<Listeners<E>>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Listeners<E>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn listener_count(&self) -> usize {
        self.lock().entries.len()
    }
}

impl<E: 'static> EventBus<E> {
    /// Registers `handler` and returns a handle that removes it again.
    ///
    /// Dropping the handle does not unsubscribe.
    pub fn subscribe<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut listeners = self.lock();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.entries.push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<Mutex<Listeners<E>>> = Arc::downgrade(&self.listeners);
        ListenerHandle {
            remove: Box::new(move || {
                if let Some(listeners) = weak.upgrade() {
                    listeners
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .entries
                        .retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    /// Delivers `event` to every handler registered at the time of the call.
    pub fn emit(&self, event: &E) {
        // Snapshot so handlers may subscribe/unsubscribe while being called.
        let handlers: Vec<Handler<E>> = self
            .lock()
            .entries
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::warn!("Event listener panicked, continuing delivery: {}", reason);
            }
        }
    }
}

/// Unsubscribe handle returned by [`EventBus::subscribe`].
pub struct ListenerHandle {
    remove: Box<dyn FnOnce() + Send + Sync>,
}

impl ListenerHandle {
    /// Removes the handler. Safe to call after the bus is gone.
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").finish_non_exhaustive()
    }
}
