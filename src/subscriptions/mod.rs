//! Subscriber-scoped subscription registry.
//!
//! Each subscriber gets an owned [`Subscriber`] token. Every subscription
//! it creates is recorded under that token so it can later be cancelled:
//! - all at once (`unsubscribe_all`, `release`)
//! - by event name (`unsubscribe_named`)
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new(Arc::new(NotificationCenter::new()));
//! let me = registry.subscriber();
//!
//! registry.subscribe(&me, "user.login", None, ExecutionContext::CallerThread, |n| {
//!     println!("login: {:?}", n.payload);
//! })?;
//!
//! // Later, before `me` goes away
//! registry.release(me);
//! ```

mod manager;
mod types;

pub use manager::SubscriptionRegistry;
pub use types::{Subscriber, SubscriberId, Subscription};
