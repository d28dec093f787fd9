use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Weak},
};

use crate::{
    ClientKey, DispatchOn, Error, Executor, Result, SerialQueue, Topic, TopicKey,
    internal::panic_message,
};

/// A sent event, type-erased for the trip through the registry.
#[derive(Clone)]
pub(crate) struct Published {
    pub key: TopicKey,
    pub payload: Arc<dyn Any + Send + Sync>,
}

impl Published {
    pub fn new<T: Topic>(event: T) -> Self {
        Self {
            key: TopicKey::of::<T>(),
            payload: Arc::new(event),
        }
    }
}

type Deliver = Arc<dyn Fn(&Published) + Send + Sync>;

enum Target {
    Inline,
    Executor(Weak<dyn Executor>),
}

/// A subscriber's callback with its concrete topic type erased.
///
/// The typed downcast is captured at subscribe time, so the registry can
/// store handlers for any topic side by side.
pub(crate) struct Handler {
    topic: TopicKey,
    client: ClientKey,
    target: Target,
    deliver: Deliver,
}

impl Handler {
    pub fn new<T, F>(client: ClientKey, dispatch: DispatchOn, handler: F) -> Self
    where
        T: Topic,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let topic = TopicKey::of::<T>();
        let target = match dispatch {
            DispatchOn::Inline => Target::Inline,
            DispatchOn::Executor(executor) => Target::Executor(executor),
            DispatchOn::Main => main_target(SerialQueue::try_main()),
        };

        let deliver = move |published: &Published| match published.payload.downcast_ref::<T>() {
            Some(event) => handler(event),
            None => {
                let err = Error::TopicMismatch {
                    expected: topic.type_name(),
                    actual: published.key.type_name(),
                };
                tracing::error!(error = %err, "Topic invariant violated, event dropped");
                if cfg!(debug_assertions) {
                    panic!("{err}");
                }
            }
        };

        Self {
            topic,
            client,
            target,
            deliver: Arc::new(deliver),
        }
    }

    #[inline]
    pub fn client(&self) -> &ClientKey {
        &self.client
    }

    /// Run the handler inline or hand it to its executor.
    ///
    /// A dropped executor means the handler runs inline.
    pub fn invoke(&self, published: &Published, isolate_panics: bool) {
        let executor = match &self.target {
            Target::Inline => None,
            Target::Executor(weak) => {
                let executor = weak.upgrade();
                if executor.is_none() {
                    tracing::debug!(
                        topic = %self.topic,
                        client = %self.client,
                        "Executor dropped, delivering inline"
                    );
                }
                executor
            }
        };

        match executor {
            Some(executor) => {
                let deliver = self.deliver.clone();
                let client = self.client.clone();
                let published = published.clone();
                executor.execute(Box::new(move || {
                    call(&deliver, &published, &client, isolate_panics);
                }));
            }
            None => call(&self.deliver, published, &self.client, isolate_panics),
        }
    }
}

/// The main queue, or inline delivery when it couldn't be started.
fn main_target(main: Result<Arc<SerialQueue>>) -> Target {
    match main {
        Ok(queue) => {
            let queue: Arc<dyn Executor> = queue;
            Target::Executor(Arc::downgrade(&queue))
        }
        Err(err) => {
            tracing::error!(error = %err, "Main queue unavailable, delivering inline");
            Target::Inline
        }
    }
}

fn call(deliver: &Deliver, published: &Published, client: &ClientKey, isolate_panics: bool) {
    if !isolate_panics {
        deliver(published);
        return;
    }
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| deliver(published))) {
        tracing::error!(
            topic = %published.key,
            client = %client,
            panic = panic_message(panic.as_ref()),
            "Handler panicked"
        );
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let target = match &self.target {
            Target::Inline => "Inline",
            Target::Executor(_) => "Executor",
        };
        f.debug_struct("Handler")
            .field("topic", &self.topic)
            .field("client", &self.client)
            .field("target", &target)
            .finish()
    }
}
