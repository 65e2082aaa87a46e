//! Subscription registry types.

use crate::types::ObserverHandle;
use std::fmt;

/// Registry key for one subscriber.
///
/// Issued by a registry from a process-wide counter, never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(pub u64);

impl fmt::Debug for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subscriber({})", self.0)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owned token for a subscriber.
///
/// Not `Clone`: [`SubscriptionRegistry::release`](super::SubscriptionRegistry::release)
/// consumes it, so a released subscriber cannot subscribe again. Dropping
/// it without releasing leaves its subscriptions live until the registry
/// itself goes away.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscriber {
    id: SubscriberId,
}

impl Subscriber {
    pub(crate) fn new(id: SubscriberId) -> Self {
        Self { id }
    }

    /// Registry key of this subscriber.
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

/// One registered subscription: the event name and the delivery handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subscription {
    /// Event name subscribed to.
    pub name: String,
    /// Delivery handle that cancels this subscription.
    pub handle: ObserverHandle,
}
