//! Pub/Sub event bus for player and view notifications.
//!
//! Architecture:
//! - Listeners subscribe with callbacks (immediate invocation on emit)
//! - emit() invokes listeners immediately AND queues for deferred processing
//! - poll() returns queued events for batch processing by the owner
//!
//! One bus carries one event enum (`PlayerEvent`, `ViewEvent`). Listener
//! order is FIFO (first subscribed, first called).
//!
//! The owner of a component usually ignores listeners and drains with
//! `poll()` so it can react with `&mut self`. Listeners are for read-only
//! observers such as the rendering collaborator or a logger.

use log::warn;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Shared<E> {
    listeners: RwLock<Vec<Listener<E>>>,
    queue: Mutex<Vec<E>>,
}

impl<E> Shared<E> {
    fn dispatch(&self, event: E) {
        for listener in self.listeners.read().unwrap_or_else(|e| e.into_inner()).iter() {
            listener(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(event);
    }
}

/// Event bus with immediate listeners and a deferred queue.
pub struct EventBus<E> {
    shared: Arc<Shared<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<E: Send + Sync + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.shared.listeners.read().map(|l| l.len()).unwrap_or(0))
            .field("queue_len", &self.shared.queue.lock().map(|q| q.len()).unwrap_or(0))
            .finish()
    }
}

impl<E: Send + Sync + 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                listeners: RwLock::new(Vec::new()),
                queue: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a listener invoked synchronously on every emit.
    ///
    /// # Example
    /// ```ignore
    /// player.events().subscribe(|e| log::debug!("player: {:?}", e));
    /// ```
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.shared
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(listener));
    }

    /// Invoke listeners, then queue the event for `poll()`.
    pub fn emit(&self, event: E) {
        self.shared.dispatch(event);
    }

    /// Take all queued events (oldest first).
    pub fn poll(&self) -> Vec<E> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone, Debug, PartialEq)]
    enum TestEvent {
        Add(i32),
        Reset,
    }

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicI32::new(0));
        let c = Arc::clone(&counter);

        bus.subscribe(move |e: &TestEvent| {
            if let TestEvent::Add(v) = e {
                c.fetch_add(*v, Ordering::SeqCst);
            }
        });

        bus.emit(TestEvent::Add(10));
        assert_eq!(counter.load(Ordering::SeqCst), 10);

        bus.emit(TestEvent::Add(5));
        assert_eq!(counter.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(TestEvent::Add(1));
        bus.emit(TestEvent::Reset);

        assert_eq!(bus.poll(), vec![TestEvent::Add(1), TestEvent::Reset]);
        assert!(bus.poll().is_empty());
    }

    #[test]
    fn test_listeners_called_in_subscribe_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..3 {
            let order = Arc::clone(&order);
            bus.subscribe(move |_: &TestEvent| order.lock().unwrap().push(id));
        }

        bus.emit(TestEvent::Reset);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(bus.poll(), vec![TestEvent::Reset]);
    }

    #[test]
    fn test_queue_eviction() {
        let bus = EventBus::new();
        for i in 0..(MAX_QUEUE_SIZE as i32 + 1) {
            bus.emit(TestEvent::Add(i));
        }
        let events = bus.poll();
        assert_eq!(events.len(), MAX_QUEUE_SIZE / 2 + 1);
        assert_eq!(events.last(), Some(&TestEvent::Add(MAX_QUEUE_SIZE as i32)));
    }
}
