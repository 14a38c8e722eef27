//! Subscription bookkeeping for hotplug callbacks.
//!
//! [`ListenerRegistry`] is the piece every backend shares: it hands out
//! [`SubscriptionId`]s, lets subscribers leave, and produces the list of
//! callbacks to run for an event. It does not invoke callbacks itself; backends
//! take a [`ListenerRegistry::active`] copy, release their own locks, and only
//! then call out, so a callback may re-enter the backend (e.g. to enumerate).

use crate::event::{ChangeCallback, DeviceEvent};
use std::collections::BTreeMap;

/// Handle returned by [`Backend::subscribe`](crate::backends::Backend::subscribe).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

/// Registered change callbacks, in subscription order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, ChangeCallback>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback and returns its id.
    pub fn add_listener(&mut self, callback: ChangeCallback) -> SubscriptionId {
        let id = self.next_id;
        self.listeners.insert(id, callback);
        self.next_id += 1;
        SubscriptionId(id)
    }

    /// Unregisters a listener entirely. Returns `false` if the id was unknown.
    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Callbacks that should receive the next event.
    pub fn active(&self) -> Vec<ChangeCallback> {
        self.listeners.values().cloned().collect()
    }
}

/// Deliver `events` to `callbacks`, in order.
pub fn dispatch(callbacks: &[ChangeCallback], events: &[DeviceEvent]) {
    for event in events {
        for callback in callbacks {
            callback(event);
        }
    }
}
