//! Core types shared by the bus, the registry and the delivery primitive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter for generating sender identities.
static NEXT_SENDER: AtomicU64 = AtomicU64::new(1);

/// Identity of whoever posts a notification.
///
/// Observers may filter on a sender. Comparison is exact equality of the
/// token, never of the value that owns it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub u64);

impl SenderId {
    /// Issue a fresh, process-unique sender identity.
    pub fn new() -> Self {
        SenderId(NEXT_SENDER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SenderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SenderId({})", self.0)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque token for one registration in the delivery primitive.
///
/// Passing it back to [`Delivery::cancel`](crate::Delivery::cancel) cancels
/// exactly that registration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverHandle(pub u64);

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Observer({})", self.0)
    }
}

impl fmt::Display for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named event, optionally tagged with a sender and a payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Event name observers subscribe to.
    pub name: String,

    /// Who posted it (None = anonymous).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderId>,

    /// Attached data. Never inspected by the bus.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl Notification {
    /// Create an anonymous notification without payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sender: None,
            payload: None,
        }
    }

    /// Tag the notification with a sender.
    pub fn with_sender(mut self, sender: SenderId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Attach a payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Whether an observer filtered on `filter` should see this notification.
    ///
    /// An unfiltered observer sees every sender; a filtered one only sees
    /// notifications carrying exactly that sender.
    pub fn matches_sender(&self, filter: Option<SenderId>) -> bool {
        match filter {
            None => true,
            Some(wanted) => self.sender == Some(wanted),
        }
    }
}

/// Callback invoked for each delivered notification.
pub type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;
