use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, OnceLock, PoisonError},
    thread::{JoinHandle, ThreadId},
};

use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::{Error, Executor, Job, Result, internal::panic_message};

static MAIN_QUEUE: OnceLock<Arc<SerialQueue>> = OnceLock::new();
const MAIN_LABEL: &str = "eventbus-main";

/// A named FIFO executor backed by a dedicated worker thread.
///
/// Jobs run one at a time, in the order they were submitted. A panicking
/// job is logged and the queue carries on with the next one.
///
/// - `new(label)` starts the worker thread.
/// - `shutdown()` stops accepting jobs, lets queued ones finish and joins the worker.
/// - Dropping the last handle closes the queue the same way, without joining.
///
/// [`SerialQueue::main`] is the process-wide queue behind [`DispatchOn::Main`](crate::DispatchOn::Main).
pub struct SerialQueue {
    label: Arc<str>,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl SerialQueue {
    /// Start a new queue. The label names the worker thread and shows up in logs.
    pub fn new(label: &str) -> Result<Arc<Self>> {
        let label: Arc<str> = Arc::from(label);
        let (tx, mut rx) = unbounded_channel::<Job>();

        let worker_label = label.clone();
        let worker = std::thread::Builder::new()
            .name(label.to_string())
            .spawn(move || {
                tracing::debug!(queue = %worker_label, "Serial queue started");
                while let Some(job) = rx.blocking_recv() {
                    if let Err(panic) = catch_unwind(AssertUnwindSafe(job)) {
                        tracing::error!(
                            queue = %worker_label,
                            panic = panic_message(panic.as_ref()),
                            "Job panicked"
                        );
                    }
                }
                tracing::debug!(queue = %worker_label, "Serial queue stopped");
            })
            .map_err(|e| Error::QueueSpawn(label.to_string(), e))?;

        Ok(Arc::new(Self {
            label,
            worker_id: worker.thread().id(),
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }))
    }

    /// The process-wide main queue, started on first use and never shut down.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread can't be spawned on first use.
    /// See [`SerialQueue::try_main`] for the fallible version.
    pub fn main() -> Arc<SerialQueue> {
        match Self::try_main() {
            Ok(queue) => queue,
            Err(err) => panic!("{err}"),
        }
    }

    /// The process-wide main queue, or the error that kept it from starting.
    ///
    /// A failed start isn't cached; the next call tries again.
    pub fn try_main() -> Result<Arc<SerialQueue>> {
        if let Some(queue) = MAIN_QUEUE.get() {
            return Ok(queue.clone());
        }
        let queue = SerialQueue::new(MAIN_LABEL)?;
        // Losing a race drops our queue, which closes its worker
        Ok(MAIN_QUEUE.get_or_init(|| queue).clone())
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the calling thread is this queue's worker.
    #[inline]
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.worker_id
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|tx| tx.is_closed())
    }

    /// Enqueue a job, failing with [`Error::QueueClosed`] after shutdown.
    pub fn try_execute(&self, job: Job) -> Result<()> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(tx) => tx
                .send(job)
                .map_err(|_| Error::QueueClosed(self.label.to_string())),
            None => Err(Error::QueueClosed(self.label.to_string())),
        }
    }

    /// Close the queue and wait for already enqueued jobs to finish.
    ///
    /// When called from a job running on this queue, the queue is closed
    /// but not joined.
    pub fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if self.is_current() {
            return;
        }
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.join(); // Jobs are panic-isolated
        }
    }
}

impl Executor for SerialQueue {
    /// Enqueue the job; if the queue is already closed, run it on the caller's thread.
    fn execute(&self, job: Job) {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let job = match sender.as_ref() {
            Some(tx) => match tx.send(job) {
                Ok(()) => return,
                Err(e) => e.0,
            },
            None => job,
        };
        drop(sender);
        tracing::debug!(queue = %self.label, "Queue closed, running job inline");
        job();
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}
