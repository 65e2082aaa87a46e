//! In-process notification center.

use super::context::{ExecutionContext, MainContext, WeakMainContext};
use super::worker::BackgroundWorker;
use super::Delivery;
use crate::config::BusConfig;
use crate::error::Result;
use crate::types::{Handler, Notification, ObserverHandle, SenderId};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace, warn};

/// How an observer's handler reaches its thread.
enum Dispatch {
    Inline,
    Main(WeakMainContext),
    Worker(BackgroundWorker),
}

/// Internal observer state.
struct Observer {
    handle: ObserverHandle,
    sender: Option<SenderId>,
    handler: Handler,
    dispatch: Dispatch,
    /// Cleared on cancel so queued jobs are skipped.
    active: AtomicBool,
    catch_panics: bool,
}

impl Observer {
    /// Hand the notification to this observer's context.
    fn dispatch(self: &Arc<Self>, notification: &Notification) {
        match &self.dispatch {
            Dispatch::Inline => self.invoke(notification),
            Dispatch::Main(main) => {
                let Some(main) = main.upgrade() else {
                    return;
                };
                let observer = Arc::clone(self);
                let notification = notification.clone();
                let name = notification.name.clone();
                if let Err(e) = main.schedule(Box::new(move || observer.invoke(&notification))) {
                    warn!(observer = %self.handle, name = %name, error = %e, "main context rejected delivery");
                }
            }
            Dispatch::Worker(worker) => {
                let observer = Arc::clone(self);
                let notification = notification.clone();
                worker.execute(Box::new(move || observer.invoke(&notification)));
            }
        }
    }

    /// Run the handler on the current thread unless cancelled.
    ///
    /// The check and the call are not atomic: a `cancel` on another thread
    /// that lands in between does not stop this invocation. Only posts made
    /// after `cancel` returns are guaranteed to miss the handler.
    fn invoke(&self, notification: &Notification) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        if !self.catch_panics {
            (self.handler)(notification);
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(notification)));
        if let Err(panic) = result {
            error!(
                observer = %self.handle,
                name = %notification.name,
                panic = %panic_message(&panic),
                "handler panicked"
            );
        }
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

/// Observers by name, plus the reverse index used by `cancel`.
#[derive(Default)]
struct ObserverTable {
    by_name: HashMap<String, Vec<Arc<Observer>>>,
    names: HashMap<ObserverHandle, String>,
}

struct CenterInner {
    observers: RwLock<ObserverTable>,
    next_handle: AtomicU64,
    main: MainContext,
    config: BusConfig,
}

impl CenterInner {
    fn deliver(&self, notification: &Notification) {
        // Snapshot so no lock is held while handlers run.
        let matching: Vec<Arc<Observer>> = {
            let table = self.observers.read();
            match table.by_name.get(&notification.name) {
                Some(observers) => observers
                    .iter()
                    .filter(|o| notification.matches_sender(o.sender))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };

        trace!(
            name = %notification.name,
            sender = ?notification.sender,
            observers = matching.len(),
            "delivering notification"
        );

        for observer in &matching {
            observer.dispatch(notification);
        }
    }
}

/// Name-keyed broadcast of notifications to registered observers.
///
/// Cheap to clone; clones share the same observers and main context.
#[derive(Clone)]
pub struct NotificationCenter {
    inner: Arc<CenterInner>,
}

impl NotificationCenter {
    /// Create a notification center with the default configuration.
    pub fn new() -> Self {
        Self::build(BusConfig::default())
    }

    /// Create a notification center with a custom configuration.
    pub fn with_config(config: BusConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BusConfig) -> Self {
        let main = match config.main_queue_capacity {
            Some(capacity) => MainContext::bounded(capacity),
            None => MainContext::new(),
        };
        Self {
            inner: Arc::new(CenterInner {
                observers: RwLock::new(ObserverTable::default()),
                next_handle: AtomicU64::new(1),
                main,
                config,
            }),
        }
    }

    /// Number of live observers across all names.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().names.len()
    }

    /// Number of live observers for one name.
    pub fn observers_for(&self, name: &str) -> usize {
        self.inner
            .observers
            .read()
            .by_name
            .get(name)
            .map_or(0, Vec::len)
    }

    /// Whether `handle` is still registered.
    pub fn is_registered(&self, handle: ObserverHandle) -> bool {
        self.inner.observers.read().names.contains_key(&handle)
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Delivery for NotificationCenter {
    fn register(
        &self,
        name: &str,
        sender: Option<SenderId>,
        context: ExecutionContext,
        handler: Handler,
    ) -> Result<ObserverHandle> {
        let handle = ObserverHandle(self.inner.next_handle.fetch_add(1, Ordering::SeqCst));
        let config = &self.inner.config;

        let dispatch = match context {
            ExecutionContext::CallerThread => Dispatch::Inline,
            ExecutionContext::Main => Dispatch::Main(self.inner.main.downgrade()),
            ExecutionContext::Background => Dispatch::Worker(BackgroundWorker::spawn(
                format!("{}-{}", config.worker_name_prefix, handle.0),
                config.worker_stack_size,
            )?),
        };

        let observer = Arc::new(Observer {
            handle,
            sender,
            handler,
            dispatch,
            active: AtomicBool::new(true),
            catch_panics: config.catch_handler_panics,
        });

        {
            let mut table = self.inner.observers.write();
            table
                .by_name
                .entry(name.to_string())
                .or_default()
                .push(observer);
            table.names.insert(handle, name.to_string());
        }

        debug!(observer = %handle, name, sender = ?sender, context = ?context, "observer registered");
        Ok(handle)
    }

    fn deliver(&self, notification: &Notification) {
        self.inner.deliver(notification);
    }

    fn deliver_deferred(&self, notification: Notification) -> Result<()> {
        // Weak so a never-drained main queue does not keep the center alive.
        let center: Weak<CenterInner> = Arc::downgrade(&self.inner);
        self.inner.main.schedule(Box::new(move || {
            if let Some(center) = center.upgrade() {
                center.deliver(&notification);
            }
        }))
    }

    fn cancel(&self, handle: ObserverHandle) -> bool {
        let removed = {
            let mut table = self.inner.observers.write();
            let Some(name) = table.names.remove(&handle) else {
                return false;
            };

            let mut removed = None;
            if let Some(observers) = table.by_name.get_mut(&name) {
                if let Some(pos) = observers.iter().position(|o| o.handle == handle) {
                    removed = Some(observers.remove(pos));
                }
                if observers.is_empty() {
                    table.by_name.remove(&name);
                }
            }
            removed
        };

        match removed {
            Some(observer) => {
                observer.active.store(false, Ordering::SeqCst);
                debug!(observer = %handle, "observer cancelled");
                true
            }
            None => false,
        }
    }

    fn main_context(&self) -> &MainContext {
        &self.inner.main
    }
}
