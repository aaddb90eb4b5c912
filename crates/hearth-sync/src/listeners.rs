//! Per-model subscriber registry and notification fan-out.
//!
//! Each model owns one [`ListenerRegistry`]. Entries are keyed by
//! `(event type, subscriber id)`; registering the same pair again replaces the
//! callback. Components must call [`ListenerRegistry::unregister_all_listeners`]
//! on teardown, or hold a [`ListenerGuard`] which does it on drop.

use std::collections::HashMap;
use std::sync::Arc;

use hearth_core::{EventType, ModelName, Notification, SubscriberId};
use parking_lot::Mutex;
use tracing::trace;

/// Callback invoked synchronously on notification.
pub type Listener = Arc<dyn Fn(&Notification) + Send + Sync>;

pub struct ListenerRegistry {
    owner: ModelName,
    listeners: Mutex<HashMap<EventType, HashMap<SubscriberId, Listener>>>,
}

impl ListenerRegistry {
    pub fn new(owner: ModelName) -> Self {
        Self {
            owner,
            listeners: Mutex::new(HashMap::new()),
        }
    }

    /// Name stamped as `source` on notifications raised here.
    pub fn owner(&self) -> &ModelName {
        &self.owner
    }

    /// Register `listener` for `event` under `subscriber`. Last write wins.
    pub fn register_listener<F>(&self, subscriber: &SubscriberId, event: EventType, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let _ = self
            .listeners
            .lock()
            .entry(event)
            .or_default()
            .insert(subscriber.clone(), Arc::new(listener));
    }

    /// Remove `subscriber` from every event type. Returns how many entries
    /// were removed; zero is fine.
    pub fn unregister_all_listeners(&self, subscriber: &SubscriberId) -> usize {
        let mut listeners = self.listeners.lock();
        let mut removed = 0;
        listeners.retain(|_, subscribers| {
            if subscribers.remove(subscriber).is_some() {
                removed += 1;
            }
            !subscribers.is_empty()
        });
        if removed > 0 {
            trace!(
                model = %self.owner,
                subscriber = %subscriber,
                removed,
                "listeners unregistered"
            );
        }
        removed
    }

    /// Invoke every callback registered for `event`, in unspecified order.
    ///
    /// Callbacks are snapshotted first and run without the registry lock held.
    /// A panicking listener propagates to the caller.
    pub fn notify_listeners(&self, event: EventType) {
        self.notify(&Notification::new(event, self.owner.clone()));
    }

    /// Deliver an already-built notification to this registry's listeners.
    pub fn notify(&self, notification: &Notification) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .get(&notification.event)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default();

        trace!(
            model = %self.owner,
            event = %notification.event,
            listeners = snapshot.len(),
            "notify"
        );
        for listener in snapshot {
            listener(notification);
        }
    }

    pub fn listener_count(&self, event: EventType) -> usize {
        self.listeners.lock().get(&event).map_or(0, HashMap::len)
    }

    pub fn is_registered(&self, subscriber: &SubscriberId, event: EventType) -> bool {
        self.listeners
            .lock()
            .get(&event)
            .is_some_and(|subscribers| subscribers.contains_key(subscriber))
    }

    /// Distinct subscribers across all event types.
    pub fn subscriber_count(&self) -> usize {
        let listeners = self.listeners.lock();
        let mut ids: Vec<&SubscriberId> = listeners.values().flat_map(HashMap::keys).collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }
}

/// Unregisters a subscriber from a set of registries when dropped.
pub struct ListenerGuard {
    subscriber: SubscriberId,
    registries: Vec<Arc<ListenerRegistry>>,
}

impl ListenerGuard {
    pub fn new(subscriber: SubscriberId) -> Self {
        Self {
            subscriber,
            registries: Vec::new(),
        }
    }

    pub fn subscriber(&self) -> &SubscriberId {
        &self.subscriber
    }

    /// Track `registry` and register a listener on it in one step.
    pub fn listen<F>(&mut self, registry: &Arc<ListenerRegistry>, event: EventType, listener: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        registry.register_listener(&self.subscriber, event, listener);
        if !self.registries.iter().any(|r| Arc::ptr_eq(r, registry)) {
            self.registries.push(Arc::clone(registry));
        }
    }

    /// Detach from every tracked registry now. Idempotent.
    pub fn release(&mut self) -> usize {
        self.registries
            .drain(..)
            .map(|registry| registry.unregister_all_listeners(&self.subscriber))
            .sum()
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Publishes a model's notifications, optionally cascading them to a second
/// registry.
///
/// An alternate-context extension publishes to its own registry first and
/// then re-raises the event through the primary model's registry, so the
/// primary's subscribers see updates whichever side is active.
#[derive(Clone)]
pub struct Notifier {
    own: Arc<ListenerRegistry>,
    upstream: Option<Arc<ListenerRegistry>>,
}

impl Notifier {
    pub fn new(own: Arc<ListenerRegistry>) -> Self {
        Self { own, upstream: None }
    }

    /// Notifier for `own` whose events are re-raised through `primary`.
    pub fn cascading(own: Arc<ListenerRegistry>, primary: Arc<ListenerRegistry>) -> Self {
        Self {
            own,
            upstream: Some(primary),
        }
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.own
    }

    pub fn is_cascading(&self) -> bool {
        self.upstream.is_some()
    }

    pub fn notify_listeners(&self, event: EventType) {
        self.own.notify_listeners(event);
        if let Some(primary) = &self.upstream {
            primary.notify_listeners(event);
        }
    }
}
