//! # Event Bus
//!
//! A subscriber-scoped registry over a name-keyed notification center.
//!
//! ## Core Concepts
//!
//! - **Notifications**: named events with an optional sender and payload
//! - **Subscribers**: owned tokens that group subscriptions for bulk cancel
//! - **Execution contexts**: handlers run on the posting thread, the main
//!   context, or a background thread of their own
//! - **Main context**: a FIFO queue the application drives from its main
//!   thread
//!
//! ## Example
//!
//! ```ignore
//! use eventbus::{EventBus, ExecutionContext};
//!
//! let bus = EventBus::new();
//! let screen = bus.subscriber();
//!
//! bus.subscribe(&screen, "user.login", None, ExecutionContext::CallerThread, |n| {
//!     println!("logged in: {:?}", n.payload);
//! })?;
//! bus.subscribe_main_thread(&screen, "theme.changed", None, |_| redraw())?;
//!
//! bus.post("user.login", None, Some(json!({"id": 42})));
//! bus.post_deferred("theme.changed", None, None);
//! bus.main_context().run_pending()?;
//!
//! // Before the screen goes away
//! bus.release(screen);
//! ```

pub mod bus;
pub mod config;
pub mod delivery;
pub mod error;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use bus::EventBus;
pub use config::BusConfig;
pub use delivery::{Delivery, ExecutionContext, MainContext, NotificationCenter};
pub use error::{BusError, Result};
pub use subscriptions::{Subscriber, SubscriberId, Subscription, SubscriptionRegistry};
pub use types::*;
