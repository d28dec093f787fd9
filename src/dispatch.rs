use std::sync::{Arc, Mutex, PoisonError, Weak};

/// A unit of work handed to an [`Executor`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// An execution context handlers can be redispatched onto.
///
/// The bus only ever holds a [`Weak`] reference to an executor, so
/// subscribing never extends its lifetime. Implementations decide where
/// and when the job runs; the bus does not wait for it.
///
/// Implemented by [`SerialQueue`](crate::SerialQueue) and by
/// [`tokio::runtime::Handle`].
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, job: Job);
}

/// Runs the job on the runtime's blocking pool. Once the runtime has shut
/// down the job runs on the caller's thread instead.
impl Executor for tokio::runtime::Handle {
    fn execute(&self, job: Job) {
        // Whoever takes the job first runs it
        let slot = Arc::new(Mutex::new(Some(job)));
        let task_slot = slot.clone();
        let task = self.spawn_blocking(move || {
            if let Some(job) = take_job(&task_slot) {
                job();
            }
        });

        // A runtime that is shutting down cancels the task before returning it
        if task.is_finished() {
            if let Some(job) = take_job(&slot) {
                tracing::debug!("Runtime shut down, running job inline");
                job();
            }
        }
    }
}

fn take_job(slot: &Mutex<Option<Job>>) -> Option<Job> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Where a subscriber's handler runs when an event is sent.
///
/// - `Main`: asynchronously, on the process-wide main queue
///   ([`SerialQueue::main`](crate::SerialQueue::main)).
/// - `Executor`: asynchronously, on a caller-provided executor held weakly.
///   If the executor is gone by the time an event arrives, the handler runs
///   inline instead.
/// - `Inline`: synchronously, on the sending thread, before `send` returns.
#[derive(Clone, Default)]
pub enum DispatchOn {
    #[default]
    Main,
    Executor(Weak<dyn Executor>),
    Inline,
}

impl DispatchOn {
    /// Redispatch onto the given executor without taking ownership of it.
    pub fn executor<X: Executor>(executor: &Arc<X>) -> Self {
        let executor: Arc<dyn Executor> = executor.clone();
        DispatchOn::Executor(Arc::downgrade(&executor))
    }

    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self, DispatchOn::Inline)
    }
}

impl std::fmt::Debug for DispatchOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchOn::Main => write!(f, "Main"),
            DispatchOn::Executor(weak) if weak.strong_count() > 0 => write!(f, "Executor"),
            DispatchOn::Executor(_) => write!(f, "Executor(dropped)"),
            DispatchOn::Inline => write!(f, "Inline"),
        }
    }
}

impl std::fmt::Display for DispatchOn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}
