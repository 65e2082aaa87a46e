//! Execution contexts: where handlers run.

use crate::error::{BusError, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use tracing::debug;

/// Unit of work queued on a context.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where a subscription's handler is invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// Synchronously, on whichever thread posts.
    CallerThread,
    /// On the designated main context, in FIFO order.
    Main,
    /// On a background thread created for this subscription alone.
    Background,
}

/// FIFO executor standing in for an application's main/UI thread.
///
/// Work is queued from any thread and runs on whichever thread drives the
/// context through [`run_pending`](Self::run_pending),
/// [`run_for`](Self::run_for) or [`run`](Self::run). The first thread to
/// drive it becomes its main thread; driving it from any other thread
/// fails with [`BusError::MainThreadMismatch`].
#[derive(Clone)]
pub struct MainContext {
    inner: Arc<MainInner>,
}

struct MainInner {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    closed: AtomicBool,
    thread: Mutex<Option<ThreadId>>,
}

impl MainContext {
    /// Create a context with an unbounded queue.
    pub fn new() -> Self {
        Self::from_channel(unbounded())
    }

    /// Create a context whose queue holds at most `capacity` jobs.
    pub fn bounded(capacity: usize) -> Self {
        Self::from_channel(bounded(capacity))
    }

    fn from_channel((sender, receiver): (Sender<Job>, Receiver<Job>)) -> Self {
        Self {
            inner: Arc::new(MainInner {
                sender,
                receiver,
                closed: AtomicBool::new(false),
                thread: Mutex::new(None),
            }),
        }
    }

    /// Queue arbitrary work on the main context.
    pub fn execute<F>(&self, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule(Box::new(work))
    }

    pub(crate) fn schedule(&self, job: Job) -> Result<()> {
        if self.is_closed() {
            return Err(BusError::ContextClosed);
        }
        match self.inner.sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Err(BusError::MainQueueFull),
            Err(TrySendError::Disconnected(_)) => return Err(BusError::ContextClosed),
        }
        // A shutdown that drained between the check and the send would
        // strand the job.
        if self.is_closed() {
            self.inner.receiver.try_iter().for_each(drop);
            return Err(BusError::ContextClosed);
        }
        Ok(())
    }

    /// Handle that does not keep the context alive.
    pub(crate) fn downgrade(&self) -> WeakMainContext {
        WeakMainContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Run the jobs queued at the time of the call on the current thread.
    ///
    /// Jobs queued by those jobs wait for the next call. Returns the number
    /// of jobs run.
    pub fn run_pending(&self) -> Result<usize> {
        self.bind()?;

        let pending = self.inner.receiver.len();
        let mut ran = 0;
        for _ in 0..pending {
            if self.is_closed() {
                break;
            }
            match self.inner.receiver.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        Ok(ran)
    }

    /// Process jobs until `timeout` elapses or the context is shut down.
    pub fn run_for(&self, timeout: Duration) -> Result<usize> {
        self.bind()?;
        let deadline = Instant::now() + timeout;
        self.drive(Some(deadline))
    }

    /// Process jobs until the context is shut down.
    pub fn run(&self) -> Result<usize> {
        self.bind()?;
        self.drive(None)
    }

    fn drive(&self, deadline: Option<Instant>) -> Result<usize> {
        // Upper bound on a single wait so a missed wake-up still observes
        // shutdown.
        const POLL: Duration = Duration::from_millis(50);

        let mut ran = 0;
        loop {
            if self.is_closed() {
                break;
            }
            let wait = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }
                    (deadline - now).min(POLL)
                }
                None => POLL,
            };
            match self.inner.receiver.recv_timeout(wait) {
                Ok(job) => {
                    if self.is_closed() {
                        break;
                    }
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(ran)
    }

    /// Stop accepting work and discard anything still queued.
    ///
    /// A thread blocked in [`run`](Self::run) or [`run_for`](Self::run_for)
    /// returns shortly after.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let discarded = self.inner.receiver.try_iter().count();
        // Wake a blocked driver.
        let _ = self.inner.sender.try_send(Box::new(|| {}));
        debug!(discarded, "main context shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Whether the calling thread is this context's main thread.
    pub fn is_current(&self) -> bool {
        *self.inner.thread.lock() == Some(thread::current().id())
    }

    /// Number of jobs waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.receiver.len()
    }

    fn bind(&self) -> Result<()> {
        let current = thread::current().id();
        let mut bound = self.inner.thread.lock();
        match *bound {
            Some(id) if id == current => Ok(()),
            Some(_) => Err(BusError::MainThreadMismatch),
            None => {
                *bound = Some(current);
                debug!(thread = ?current, "main context bound");
                Ok(())
            }
        }
    }
}

/// Non-owning [`MainContext`] handle.
///
/// Observers hold this so jobs queued on the context, which hold the
/// observers, do not keep the context alive in a cycle.
#[derive(Clone)]
pub(crate) struct WeakMainContext {
    inner: Weak<MainInner>,
}

impl WeakMainContext {
    pub(crate) fn upgrade(&self) -> Option<MainContext> {
        self.inner.upgrade().map(|inner| MainContext { inner })
    }
}

impl Default for MainContext {
    fn default() -> Self {
        Self::new()
    }
}
