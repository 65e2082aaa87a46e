//! Subscriber-keyed registry over the delivery primitive.

use crate::delivery::{Delivery, ExecutionContext};
use crate::error::Result;
use crate::types::{Notification, ObserverHandle, SenderId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::types::{Subscriber, SubscriberId, Subscription};

/// Counter for issuing subscriber tokens, shared by every registry so a
/// token from one bus never matches a subscriber of another.
static NEXT_SUBSCRIBER: AtomicU64 = AtomicU64::new(1);

/// Remembers which subscriptions belong to which subscriber.
///
/// Every mutation of the map happens inside one exclusive critical
/// section. Handlers are never invoked and handles are never cancelled
/// while it is held, so a handler may call back into the registry.
pub struct SubscriptionRegistry {
    /// Delivery primitive subscriptions are registered with.
    delivery: Arc<dyn Delivery>,
    /// Subscriptions by subscriber, in registration order.
    entries: Mutex<HashMap<SubscriberId, Vec<Subscription>>>,
}

impl SubscriptionRegistry {
    /// Create a registry over `delivery`.
    pub fn new(delivery: Arc<dyn Delivery>) -> Self {
        Self {
            delivery,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a new subscriber token, unique across the process.
    pub fn subscriber(&self) -> Subscriber {
        Subscriber::new(SubscriberId(NEXT_SUBSCRIBER.fetch_add(1, Ordering::SeqCst)))
    }

    /// Subscribe `target` to `name`, running `handler` on `context`.
    ///
    /// With `sender = Some(s)` only notifications posted by `s` are
    /// delivered. The returned handle may be cancelled directly through
    /// the delivery primitive; the registry then keeps a stale entry whose
    /// later cancellation is a no-op.
    pub fn subscribe<F>(
        &self,
        target: &Subscriber,
        name: &str,
        sender: Option<SenderId>,
        context: ExecutionContext,
        handler: F,
    ) -> Result<ObserverHandle>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let handle = self
            .delivery
            .register(name, sender, context, Arc::new(handler))?;

        self.entries
            .lock()
            .entry(target.id())
            .or_default()
            .push(Subscription {
                name: name.to_string(),
                handle,
            });

        debug!(subscriber = %target.id(), name, observer = %handle, "subscribed");
        Ok(handle)
    }

    /// Subscribe with the handler running on the main context.
    pub fn subscribe_main_thread<F>(
        &self,
        target: &Subscriber,
        name: &str,
        sender: Option<SenderId>,
        handler: F,
    ) -> Result<ObserverHandle>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(target, name, sender, ExecutionContext::Main, handler)
    }

    /// Subscribe with the handler running on its own background thread.
    pub fn subscribe_background<F>(
        &self,
        target: &Subscriber,
        name: &str,
        sender: Option<SenderId>,
        handler: F,
    ) -> Result<ObserverHandle>
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(target, name, sender, ExecutionContext::Background, handler)
    }

    /// Cancel every subscription of `target`.
    ///
    /// Unknown targets are a no-op. Returns the number of subscriptions
    /// removed.
    pub fn unsubscribe_all(&self, target: &Subscriber) -> usize {
        self.remove_all(target.id())
    }

    /// Cancel the subscriptions of `target` named `name`, keeping the rest.
    ///
    /// Returns the number of subscriptions removed.
    pub fn unsubscribe_named(&self, target: &Subscriber, name: &str) -> usize {
        let id = target.id();
        let removed: Vec<Subscription> = {
            let mut entries = self.entries.lock();
            let Some(list) = entries.remove(&id) else {
                return 0;
            };
            let (matching, kept): (Vec<_>, Vec<_>) =
                list.into_iter().partition(|s| s.name == name);
            if !kept.is_empty() {
                entries.insert(id, kept);
            }
            matching
        };

        self.cancel_handles(&removed);
        debug!(subscriber = %id, name, removed = removed.len(), "unsubscribed by name");
        removed.len()
    }

    /// Cancel everything `subscriber` holds and retire its token.
    pub fn release(&self, subscriber: Subscriber) -> usize {
        self.remove_all(subscriber.id())
    }

    fn remove_all(&self, id: SubscriberId) -> usize {
        let removed = self.entries.lock().remove(&id).unwrap_or_default();

        self.cancel_handles(&removed);
        if !removed.is_empty() {
            debug!(subscriber = %id, removed = removed.len(), "unsubscribed all");
        }
        removed.len()
    }

    fn cancel_handles(&self, subscriptions: &[Subscription]) {
        for subscription in subscriptions {
            self.delivery.cancel(subscription.handle);
        }
    }

    // --- Introspection ---

    /// Number of subscriptions `target` holds.
    pub fn subscription_count(&self, target: &Subscriber) -> usize {
        self.entries.lock().get(&target.id()).map_or(0, Vec::len)
    }

    /// Number of subscribers with at least one subscription.
    pub fn subscriber_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Names `target` is subscribed to, in registration order.
    pub fn names(&self, target: &Subscriber) -> Vec<String> {
        self.entries
            .lock()
            .get(&target.id())
            .map(|list| list.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Subscriptions `target` holds, in registration order.
    pub fn subscriptions(&self, target: &Subscriber) -> Vec<Subscription> {
        self.entries
            .lock()
            .get(&target.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `target` holds a subscription to `name`.
    pub fn is_subscribed(&self, target: &Subscriber, name: &str) -> bool {
        self.entries
            .lock()
            .get(&target.id())
            .is_some_and(|list| list.iter().any(|s| s.name == name))
    }

    /// The delivery primitive this registry registers with.
    pub fn delivery(&self) -> &Arc<dyn Delivery> {
        &self.delivery
    }
}
