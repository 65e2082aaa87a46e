//! Name-keyed notification delivery.
//!
//! The registry and the bus only talk to the [`Delivery`] trait:
//! - `register` an observer for a name, optionally filtered by sender
//! - `deliver` a notification synchronously
//! - `deliver_deferred` it on the main context
//! - `cancel` an observer (idempotent)
//!
//! [`NotificationCenter`] is the in-process implementation used by default.

mod center;
mod context;
mod worker;

pub use center::NotificationCenter;
pub use context::{ExecutionContext, MainContext};

use crate::error::Result;
use crate::types::{Handler, Notification, ObserverHandle, SenderId};

/// Publish/subscribe primitive the bus is layered on.
pub trait Delivery: Send + Sync {
    /// Register `handler` for notifications named `name`.
    ///
    /// With `sender = Some(s)` only notifications posted by exactly `s`
    /// are delivered; with `None` every sender matches.
    fn register(
        &self,
        name: &str,
        sender: Option<SenderId>,
        context: ExecutionContext,
        handler: Handler,
    ) -> Result<ObserverHandle>;

    /// Deliver to every matching observer, dispatching each on its context.
    fn deliver(&self, notification: &Notification);

    /// Schedule [`deliver`](Self::deliver) on the main context.
    fn deliver_deferred(&self, notification: Notification) -> Result<()>;

    /// Cancel one observer. Unknown or already cancelled handles are a
    /// no-op. Returns whether an observer was removed.
    fn cancel(&self, handle: ObserverHandle) -> bool;

    /// The designated main context.
    fn main_context(&self) -> &MainContext;
}
