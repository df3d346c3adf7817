//! UI-affinity execution context.
//!
//! **Why**: Engine callbacks (metadata loads, buffering, periodic ticks,
//! seek completions, thumbnails) may arrive on any thread. None of them touch
//! player or view state directly. They are posted as messages and only
//! processed when the thread that created the context drains it.
//!
//! **Used by**: `PlayerCore` (engine + lifecycle sinks), `PlayerController`
//! (thumbnail and surface sinks), the CLI main loop.
//!
//! # Pieces
//!
//! - `UiContext<M>` - owned by the UI thread, drained once per frame/pump
//! - `UiHandle<M>` - cloneable, `Send`, posts `M` from anywhere
//! - `Sink<T>` - type-adapted posting closure handed to collaborators

use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{trace, warn};
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Message queue bound to the thread that created it.
pub struct UiContext<M> {
    owner: ThreadId,
    tx: Sender<M>,
    rx: Receiver<M>,
}

impl<M: Send + 'static> Default for UiContext<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Send + 'static> UiContext<M> {
    /// Create a context owned by the calling thread.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            owner: thread::current().id(),
            tx,
            rx,
        }
    }

    /// Posting handle for other threads and collaborators.
    pub fn handle(&self) -> UiHandle<M> {
        UiHandle {
            owner: self.owner,
            tx: self.tx.clone(),
        }
    }

    /// Sink that wraps each delivered value into `M` before posting.
    pub fn sink<T, F>(&self, wrap: F) -> Sink<T>
    where
        T: 'static,
        F: Fn(T) -> M + Send + Sync + 'static,
    {
        let handle = self.handle();
        Sink::new(move |value| {
            if !handle.post(wrap(value)) {
                trace!("UiContext gone, message dropped");
            }
        })
    }

    /// True when called on the owning thread.
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Take every queued message, in posting order.
    ///
    /// Refuses (returns nothing) when called off the owning thread; the
    /// messages stay queued for the owner.
    pub fn drain(&self) -> Vec<M> {
        if !self.is_ui_thread() {
            warn!("UiContext drained from foreign thread {:?}, ignoring", thread::current().id());
            return Vec::new();
        }
        self.rx.try_iter().collect()
    }

    /// Number of messages waiting.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// Cloneable posting side of a `UiContext`.
pub struct UiHandle<M> {
    owner: ThreadId,
    tx: Sender<M>,
}

impl<M> Clone for UiHandle<M> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            tx: self.tx.clone(),
        }
    }
}

impl<M> fmt::Debug for UiHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiHandle").field("owner", &self.owner).finish()
    }
}

impl<M> UiHandle<M> {
    /// Queue a message for the UI thread. Never runs anything in place.
    ///
    /// Returns `false` if the context is gone.
    pub fn post(&self, msg: M) -> bool {
        if thread::current().id() != self.owner {
            trace!("Redispatching message onto UI context from {:?}", thread::current().id());
        }
        self.tx.send(msg).is_ok()
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }
}

/// Delivery endpoint given to external collaborators (engine, lifecycle hub,
/// thumbnail generator, render surface).
pub struct Sink<T> {
    deliver: Arc<dyn Fn(T) + Send + Sync>,
}

impl<T> Clone for Sink<T> {
    fn clone(&self) -> Self {
        Self {
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<T> fmt::Debug for Sink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Sink")
    }
}

impl<T: 'static> Sink<T> {
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
        }
    }

    /// Sink that drops everything.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn send(&self, value: T) {
        (self.deliver)(value);
    }

    /// Adapt to another input type.
    pub fn map<U, F>(&self, f: F) -> Sink<U>
    where
        U: 'static,
        F: Fn(U) -> T + Send + Sync + 'static,
    {
        let inner = self.clone();
        Sink::new(move |value| inner.send(f(value)))
    }
}
