//! Application lifecycle signal.
//!
//! The embedding application posts the four platform transitions into a
//! `LifecycleHub`; subscribers receive them through their `Sink` (normally a
//! UI context, so handling happens on the UI thread).
//!
//! Subscriptions are RAII: dropping a `LifecycleSubscription` releases it,
//! and `release()` may be called any number of times.

use crate::core::ui_context::Sink;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

/// Discrete application lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleEvent {
    WillResignActive,
    DidEnterBackground,
    WillEnterForeground,
    DidBecomeActive,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    sinks: BTreeMap<u64, Sink<LifecycleEvent>>,
}

/// Fan-out point for lifecycle transitions.
#[derive(Clone, Default)]
pub struct LifecycleHub {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for LifecycleHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleHub")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl LifecycleHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. The returned subscription must be kept alive.
    pub fn subscribe(&self, sink: Sink<LifecycleEvent>) -> LifecycleSubscription {
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        registry.next_id += 1;
        let id = registry.next_id;
        registry.sinks.insert(id, sink);
        debug!("Lifecycle subscription {} added", id);
        LifecycleSubscription {
            id,
            registry: Some(Arc::downgrade(&self.registry)),
        }
    }

    /// Deliver a transition to every subscriber.
    pub fn post(&self, event: LifecycleEvent) {
        // Clone out so sinks run without the registry lock held
        let sinks: Vec<_> = self
            .registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .sinks
            .values()
            .cloned()
            .collect();
        trace!("Lifecycle {:?} -> {} subscribers", event, sinks.len());
        for sink in sinks {
            sink.send(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().unwrap_or_else(|e| e.into_inner()).sinks.len()
    }
}

/// Handle for one lifecycle registration.
#[derive(Debug)]
pub struct LifecycleSubscription {
    id: u64,
    registry: Option<Weak<Mutex<Registry>>>,
}

impl LifecycleSubscription {
    /// Unregister. Subsequent calls do nothing.
    pub fn release(&mut self) {
        let Some(weak) = self.registry.take() else {
            return;
        };
        if let Some(registry) = weak.upgrade() {
            registry
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .sinks
                .remove(&self.id);
            debug!("Lifecycle subscription {} released", self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        self.release();
    }
}
