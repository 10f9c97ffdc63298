//! The host's serial execution context.
//!
//! The real host runs API work on a single designated thread fed by an event
//! queue; [`HostExecutor`] reproduces that model with a dedicated thread
//! owning the [`HostSession`] outright. Nothing else can reach host state:
//! the only way in is a queued work item.
//!
//! The bridge depends solely on [`SerialExecutor::enqueue`], so tests swap in
//! fake executors (never-runs, run-on-demand, always-fails) freely.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread::JoinHandle;

use crate::host::HostSession;

/// Work scheduled onto the host execution context.
pub type WorkItem = Box<dyn FnOnce(&mut HostSession) + Send + 'static>;

/// Minimal scheduling contract of the foreign execution context: queue work,
/// run it later on the designated thread, FIFO. Whether "later" means
/// immediately or on the next idle tick is the executor's business.
pub trait SerialExecutor: Send + Sync + 'static {
    fn enqueue(&self, work: WorkItem) -> Result<(), EnqueueError>;
}

/// The executor refused the work item; the call it belonged to fails as a
/// dispatch failure.
#[derive(Debug, Clone, thiserror::Error)]
#[error("host executor unavailable: {reason}")]
pub struct EnqueueError {
    reason: String,
}

impl EnqueueError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Dedicated host thread draining a FIFO work queue.
pub struct HostExecutor {
    tx: Mutex<Option<mpsc::Sender<WorkItem>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl HostExecutor {
    /// Start the host thread and hand it ownership of `session`.
    pub fn spawn(session: HostSession) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel::<WorkItem>();
        let handle = std::thread::Builder::new()
            .name("cadlet-host".to_string())
            .spawn(move || host_loop(rx, session))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop accepting work, drain what is already queued, and join the host
    /// thread. Idempotent.
    pub fn shutdown(&self) {
        let sender = self.tx.lock().ok().and_then(|mut guard| guard.take());
        drop(sender);

        let handle = self.handle.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle
            && handle.join().is_err()
        {
            tracing::error!("host executor thread panicked");
        }
    }
}

impl SerialExecutor for HostExecutor {
    fn enqueue(&self, work: WorkItem) -> Result<(), EnqueueError> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| EnqueueError::new("executor state poisoned"))?;
        match guard.as_ref() {
            Some(tx) => tx
                .send(work)
                .map_err(|_| EnqueueError::new("host thread stopped")),
            None => Err(EnqueueError::new("executor is shut down")),
        }
    }
}

impl Drop for HostExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn host_loop(rx: mpsc::Receiver<WorkItem>, mut session: HostSession) {
    tracing::debug!("host executor started");
    while let Ok(work) = rx.recv() {
        // A panicking work item must not take the host thread down with it;
        // its completion guard already reported the failure to the caller.
        if catch_unwind(AssertUnwindSafe(|| work(&mut session))).is_err() {
            tracing::error!("work item panicked on the host executor");
        }
    }
    tracing::debug!("host executor stopped");
}
