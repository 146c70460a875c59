//! Synchronous fan-out of domain events to observers.

use std::sync::RwLock;

type Listener<E> = Box<dyn Fn(&E) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread; keep handlers fast to
/// avoid stalling the operation that published the event. Listeners must not
/// subscribe new listeners from inside a callback.
pub struct EventBus<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&E) + Send + Sync + 'static) {
        if let Ok(mut listeners) = self.listeners.write() {
            listeners.push(Box::new(listener));
        }
    }

    pub fn emit(&self, event: &E) {
        if let Ok(listeners) = self.listeners.read() {
            for listener in listeners.iter() {
                listener(event);
            }
        }
    }

    /// Emit a batch of events in order.
    pub fn emit_all(&self, events: &[E]) {
        for event in events {
            self.emit(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
