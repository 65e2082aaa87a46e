//! Dedicated background thread for one observer.

use super::context::Job;
use crate::error::Result;
use crossbeam_channel::{unbounded, Sender};
use std::thread;
use tracing::{debug, warn};

/// A named worker thread that runs jobs in order until dropped.
///
/// The thread exits once every sender is gone, which happens when the
/// owning observer is cancelled and its last queued job has run.
pub(crate) struct BackgroundWorker {
    name: String,
    sender: Sender<Job>,
}

impl BackgroundWorker {
    /// Spawn a new worker thread.
    pub(crate) fn spawn(name: String, stack_size: Option<usize>) -> Result<Self> {
        let (sender, receiver) = unbounded::<Job>();

        let mut builder = thread::Builder::new().name(name.clone());
        if let Some(size) = stack_size {
            builder = builder.stack_size(size);
        }

        let thread_name = name.clone();
        builder.spawn(move || {
            debug!(worker = %thread_name, "background worker started");
            for job in receiver.iter() {
                job();
            }
            debug!(worker = %thread_name, "background worker stopped");
        })?;

        Ok(Self { name, sender })
    }

    /// Queue a job on the worker.
    pub(crate) fn execute(&self, job: Job) {
        if self.sender.send(job).is_err() {
            warn!(worker = %self.name, "background worker is gone, job dropped");
        }
    }
}
