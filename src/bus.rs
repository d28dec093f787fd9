use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use crate::{
    ClientKey, Config, DispatchOn, Topic, TopicKey,
    internal::{Handler, Published, Registry},
};

static GLOBAL_BUS: OnceLock<Bus> = OnceLock::new();

/// Routes topic events from senders to subscribed clients.
///
/// - `subscribe(client, handler)` registers one handler per (topic type, client).
///   Subscribing again for the same pair replaces the handler.
/// - `send(event)` fans the event out to every handler of its concrete type.
/// - `unsubscribe::<T>(client)` / `unsubscribe_all(client)` remove registrations.
///
/// All operations are serialized by one lock per bus. `send` only holds it
/// while taking a snapshot of the handlers, which then run (or get
/// scheduled) after the lock is released; handlers are free to call back
/// into the bus. Unsubscribing doesn't affect deliveries already
/// snapshotted or enqueued on an executor.
///
/// `Bus` is a cheap handle: clones share the same registry. Prefer passing
/// a bus to the components that need it; [`Bus::global`] is there for
/// convenience.
///
/// # Example
///
/// ```rust
/// use eventbus::{Bus, DispatchOn, Topic};
///
/// struct Greeting(String);
/// impl Topic for Greeting {}
///
/// let bus = Bus::new();
/// bus.subscribe_on(0, DispatchOn::Inline, |g: &Greeting| println!("Hello, {}!", g.0));
/// assert_eq!(bus.send(Greeting("World".into())), 1);
/// ```
///
/// See also: [`Topic`], [`ClientKey`], [`DispatchOn`].
#[derive(Clone, Default)]
pub struct Bus {
    registry: Arc<Mutex<Registry>>,
    config: Arc<Config>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            registry: Arc::default(),
            config: Arc::new(config),
        }
    }

    /// The process-wide bus, created with the default config on first use.
    /// It lives until the process exits.
    pub fn global() -> &'static Bus {
        GLOBAL_BUS.get_or_init(Bus::new)
    }

    /// Deliver the event to every handler subscribed to its type.
    ///
    /// Inline handlers have run by the time this returns; handlers bound to
    /// an executor have only been scheduled. Returns the number of handlers
    /// reached, zero if the topic has no subscribers.
    pub fn send<T: Topic>(&self, event: T) -> usize {
        let key = TopicKey::of::<T>();
        let handlers = self.lock().snapshot(&key);
        if handlers.is_empty() {
            tracing::trace!(topic = %key, "No subscribers");
            return 0;
        }

        tracing::trace!(topic = %key, event = %event.name(), subscribers = handlers.len(), "Sending");
        let published = Published::new(event);
        for handler in &handlers {
            handler.invoke(&published, self.config.isolate_panics);
        }
        handlers.len()
    }

    /// Subscribe the client to topic `T`, using the configured default dispatch.
    pub fn subscribe<T, F>(&self, client: impl Into<ClientKey>, handler: F)
    where
        T: Topic,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.subscribe_on(client, self.config.default_dispatch.clone(), handler);
    }

    /// Subscribe the client to topic `T`, running the handler as `dispatch` says.
    ///
    /// Replaces the client's previous handler for `T`, if any.
    pub fn subscribe_on<T, F>(&self, client: impl Into<ClientKey>, dispatch: DispatchOn, handler: F)
    where
        T: Topic,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let key = TopicKey::of::<T>();
        let client = client.into();
        tracing::trace!(topic = %key, client = %client, dispatch = %dispatch, "Subscribing");

        let handler = Handler::new::<T, F>(client, dispatch, handler);
        if let Some(old) = self.lock().insert(key, handler) {
            tracing::trace!(topic = %key, client = %old.client(), "Replaced previous handler");
        }
    }

    /// Remove the client's handler for topic `T`. Returns whether one existed.
    pub fn unsubscribe<T: Topic>(&self, client: impl Into<ClientKey>) -> bool {
        let key = TopicKey::of::<T>();
        let client = client.into();
        let removed = self.lock().remove(&key, &client);
        tracing::trace!(topic = %key, client = %client, removed, "Unsubscribing");
        removed
    }

    /// Remove the client's handlers for every topic. Returns how many were removed.
    pub fn unsubscribe_all(&self, client: impl Into<ClientKey>) -> usize {
        let client = client.into();
        let removed = self.lock().remove_client(&client);
        tracing::trace!(client = %client, removed, "Unsubscribing from all topics");
        removed
    }

    /// Number of clients subscribed to topic `T`.
    pub fn subscriber_count<T: Topic>(&self) -> usize {
        self.lock().count(&TopicKey::of::<T>())
    }

    pub fn is_subscribed<T: Topic>(&self, client: impl Into<ClientKey>) -> bool {
        self.lock().contains(&TopicKey::of::<T>(), &client.into())
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.lock().topic_count()
    }

    pub fn config(&self) -> &Config {
        self.config.as_ref()
    }

    // No user code runs under the lock, so a poisoned registry is still consistent.
    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Bus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bus")
            .field("topics", &self.topic_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        panic::AssertUnwindSafe,
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
    };

    use super::*;
    use crate::SerialQueue;

    #[derive(Debug, Clone, PartialEq)]
    struct Tick(u32);
    impl Topic for Tick {}

    #[derive(Debug)]
    struct Tock;
    impl Topic for Tock {}

    fn inline_bus() -> Bus {
        Bus::with_config(Config::default().with_default_dispatch(DispatchOn::Inline))
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Tick) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &Tick| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_send_without_subscribers_is_noop() {
        let bus = Bus::new();
        assert_eq!(bus.send(Tick(1)), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn test_fan_out_to_all_clients() {
        let bus = inline_bus();
        let (a, ha) = counter();
        let (b, hb) = counter();
        bus.subscribe::<Tick, _>(1, ha);
        bus.subscribe::<Tick, _>(2, hb);

        assert_eq!(bus.send(Tick(1)), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resubscribe_replaces_handler() {
        let bus = inline_bus();
        let (old, h_old) = counter();
        let (new, h_new) = counter();
        bus.subscribe::<Tick, _>(1, h_old);
        bus.subscribe::<Tick, _>(1, h_new);

        assert_eq!(bus.subscriber_count::<Tick>(), 1);
        bus.send(Tick(1));
        assert_eq!(old.load(Ordering::SeqCst), 0);
        assert_eq!(new.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = inline_bus();
        let (count, h) = counter();
        bus.subscribe::<Tick, _>(1, h);
        bus.subscribe(1, |_: &Tock| {});

        assert!(!bus.unsubscribe::<Tick>(2));
        assert!(bus.unsubscribe::<Tick>(1));
        assert!(!bus.unsubscribe::<Tick>(1));
        assert!(bus.is_subscribed::<Tock>(1));

        bus.send(Tick(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_all() {
        let bus = inline_bus();
        let (count, h) = counter();
        bus.subscribe::<Tick, _>("ui", h);
        bus.subscribe("ui", |_: &Tock| panic!("unsubscribed"));
        bus.subscribe("log", |_: &Tock| {});

        assert_eq!(bus.unsubscribe_all("ui"), 2);
        assert_eq!(bus.send(Tick(1)), 0);
        assert_eq!(bus.send(Tock), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(bus.topic_count(), 1);
    }

    #[test]
    fn test_event_passes_through_unchanged() {
        let bus = inline_bus();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        bus.subscribe(0, move |t: &Tick| s.lock().unwrap().push(t.clone()));

        bus.send(Tick(7));
        bus.send(Tick(9));
        assert_eq!(*seen.lock().unwrap(), vec![Tick(7), Tick(9)]);
    }

    #[test]
    fn test_handler_can_reenter_bus() {
        let bus = inline_bus();
        let (count, h) = counter();
        bus.subscribe::<Tick, _>(1, h);

        let inner = bus.clone();
        bus.subscribe(2, move |_: &Tock| {
            inner.unsubscribe::<Tock>(2);
            inner.subscribe(3, |_: &Tock| {});
            inner.send(Tick(0));
        });

        bus.send(Tock);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!bus.is_subscribed::<Tock>(2));
        assert!(bus.is_subscribed::<Tock>(3));
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = inline_bus();
        let (count, h) = counter();
        bus.subscribe(1, |_: &Tick| panic!("handler failure"));
        bus.subscribe::<Tick, _>(2, h);

        assert_eq!(bus.send(Tick(1)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[should_panic(expected = "handler failure")]
    fn test_panic_propagates_without_isolation() {
        let bus = Bus::with_config(
            Config::default()
                .with_default_dispatch(DispatchOn::Inline)
                .with_isolate_panics(false),
        );
        bus.subscribe(1, |_: &Tick| panic!("handler failure"));
        bus.send(Tick(1));
    }

    #[test]
    fn test_unisolated_panic_leaves_bus_usable() {
        let bus = Bus::with_config(
            Config::default()
                .with_default_dispatch(DispatchOn::Inline)
                .with_isolate_panics(false),
        );
        bus.subscribe(1, |t: &Tick| assert_ne!(t.0, 0, "zero tick"));

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| bus.send(Tick(0))));
        assert!(result.is_err());
        assert_eq!(bus.send(Tick(1)), 1);
        assert!(bus.is_subscribed::<Tick>(1));
    }

    #[test]
    fn test_default_dispatch_is_main_queue() {
        let bus = Bus::new();
        let (tx, rx) = mpsc::channel();
        bus.subscribe(0, move |t: &Tick| {
            tx.send((t.0, SerialQueue::main().is_current())).unwrap();
        });

        bus.send(Tick(5));
        let got = rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        assert_eq!(got, (5, true));
    }

    #[test]
    fn test_global_bus_is_shared() {
        assert!(std::ptr::eq(Bus::global(), Bus::global()));
    }
}
