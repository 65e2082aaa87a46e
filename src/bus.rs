//! Main EventBus struct tying the facade and the registry together.

use crate::config::BusConfig;
use crate::delivery::{Delivery, ExecutionContext, MainContext, NotificationCenter};
use crate::error::Result;
use crate::subscriptions::{Subscriber, SubscriptionRegistry};
use crate::types::{Notification, ObserverHandle, SenderId};
use std::sync::Arc;
use tracing::warn;

/// Process-wide event bus.
///
/// Create one at startup and share it by reference (or `Arc`) with
/// everything that posts or subscribes. Tests can build as many isolated
/// buses as they like.
///
/// Provides:
/// - Posting on the calling thread or deferred onto the main context
/// - Subscriptions scoped to a [`Subscriber`], cancellable in bulk
/// - Handler dispatch on the caller's thread, the main context, or a
///   dedicated background thread
pub struct EventBus {
    /// Delivery primitive shared with the registry.
    delivery: Arc<dyn Delivery>,

    /// Subscriber bookkeeping.
    registry: SubscriptionRegistry,
}

impl EventBus {
    /// Create a bus over a default [`NotificationCenter`].
    pub fn new() -> Self {
        Self::with_delivery(Arc::new(NotificationCenter::new()))
    }

    /// Create a bus over a [`NotificationCenter`] built from `config`.
    pub fn with_config(config: BusConfig) -> Result<Self> {
        let center = NotificationCenter::with_config(config)?;
        Ok(Self::with_delivery(Arc::new(center)))
    }

    /// Create a bus over any delivery primitive.
    pub fn with_delivery(delivery: Arc<dyn Delivery>) -> Self {
        let registry = SubscriptionRegistry::new(Arc::clone(&delivery));
        Self { delivery, registry }
    }

    // --- Posting ---

    /// Deliver `name` to matching subscribers now.
    ///
    /// Calling-thread handlers have run when this returns; main and
    /// background handlers have been queued.
    pub fn post(&self, name: &str, sender: Option<SenderId>, payload: Option<serde_json::Value>) {
        self.post_notification(build(name, sender, payload));
    }

    /// Deliver an already built notification now.
    pub fn post_notification(&self, notification: Notification) {
        self.delivery.deliver(&notification);
    }

    /// Deliver `name` later, on the main context.
    ///
    /// Fire-and-forget: if the main context refuses the work the post is
    /// dropped with a warning.
    pub fn post_deferred(
        &self,
        name: &str,
        sender: Option<SenderId>,
        payload: Option<serde_json::Value>,
    ) {
        if let Err(e) = self.try_post_deferred(name, sender, payload) {
            warn!(name, error = %e, "deferred post dropped");
        }
    }

    /// Like [`post_deferred`](Self::post_deferred), reporting a refusal.
    pub fn try_post_deferred(
        &self,
        name: &str,
        sender: Option<SenderId>,
        payload: Option<serde_json::Value>,
    ) -> Result<()> {
        self.delivery.deliver_deferred(build(name, sender, payload))
    }

    // --- Subscribing ---

    /// Issue a new subscriber token.
    pub fn subscriber(&self) -> Subscriber {
        self.registry.subscriber()
    }

    /// Subscribe `target` to `name`, running `handler` on `context`.
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
        self.registry.subscribe(target, name, sender, context, handler)
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
        self.registry
            .subscribe_main_thread(target, name, sender, handler)
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
        self.registry
            .subscribe_background(target, name, sender, handler)
    }

    /// Cancel every subscription of `target`. Returns how many were removed.
    pub fn unsubscribe_all(&self, target: &Subscriber) -> usize {
        self.registry.unsubscribe_all(target)
    }

    /// Cancel the subscriptions of `target` named `name`.
    pub fn unsubscribe_named(&self, target: &Subscriber, name: &str) -> usize {
        self.registry.unsubscribe_named(target, name)
    }

    /// Cancel everything `subscriber` holds and retire its token.
    pub fn release(&self, subscriber: Subscriber) -> usize {
        self.registry.release(subscriber)
    }

    /// Cancel one subscription directly, bypassing the registry.
    ///
    /// The registry keeps its entry; cancelling it again later is a no-op.
    pub fn cancel(&self, handle: ObserverHandle) -> bool {
        self.delivery.cancel(handle)
    }

    // --- Accessors ---

    /// The designated main context. Drive it from the application's main
    /// thread to run main-context handlers and deferred posts.
    pub fn main_context(&self) -> &MainContext {
        self.delivery.main_context()
    }

    /// Subscriber bookkeeping.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// The underlying delivery primitive.
    pub fn delivery(&self) -> &Arc<dyn Delivery> {
        &self.delivery
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn build(name: &str, sender: Option<SenderId>, payload: Option<serde_json::Value>) -> Notification {
    Notification {
        name: name.to_string(),
        sender,
        payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BusError;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_post_reaches_caller_thread_handler() {
        let bus = EventBus::new();
        let x = bus.subscriber();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = Arc::clone(&seen);
        bus.subscribe(&x, "evt", None, ExecutionContext::CallerThread, move |n| {
            s.lock().push(n.payload.clone());
        })
        .unwrap();

        bus.post("evt", None, Some(json!({"n": 1})));
        bus.post("evt", None, None);

        assert_eq!(*seen.lock(), vec![Some(json!({"n": 1})), None]);
    }

    #[test]
    fn test_post_deferred_waits_for_main_context() {
        let bus = EventBus::new();
        let x = bus.subscriber();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        bus.subscribe(&x, "evt", None, ExecutionContext::CallerThread, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        bus.post_deferred("evt", None, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.main_context().run_pending().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_post_deferred_reports_closed_context() {
        let bus = EventBus::new();
        bus.main_context().shutdown();

        let result = bus.try_post_deferred("evt", None, None);
        assert!(matches!(result, Err(BusError::ContextClosed)));

        // Fire-and-forget variant swallows the refusal.
        bus.post_deferred("evt", None, None);
    }

    #[test]
    fn test_bounded_main_queue_from_config() {
        let bus = EventBus::with_config(BusConfig {
            main_queue_capacity: Some(1),
            ..Default::default()
        })
        .unwrap();

        bus.try_post_deferred("a", None, None).unwrap();
        let result = bus.try_post_deferred("b", None, None);
        assert!(matches!(result, Err(BusError::MainQueueFull)));
    }

    #[test]
    fn test_cancel_bypasses_registry() {
        let bus = EventBus::new();
        let x = bus.subscriber();
        let handle = bus
            .subscribe(&x, "evt", None, ExecutionContext::CallerThread, |_| {})
            .unwrap();

        assert!(bus.cancel(handle));
        assert_eq!(bus.registry().subscription_count(&x), 1);
        assert_eq!(bus.unsubscribe_all(&x), 1);
        assert!(!bus.cancel(handle));
    }
}
