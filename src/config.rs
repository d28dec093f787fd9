use crate::DispatchOn;

/// Configuration of a [`Bus`](crate::Bus) instance.
///
/// Use the builder methods to customize, or [`Default`] for the usual
/// setup: handlers redispatched to the main queue and isolated from each
/// other's panics.
///
/// # Examples
///
/// ```rust
/// use eventbus::{Bus, Config, DispatchOn};
///
/// let config = Config::default()
///     .with_default_dispatch(DispatchOn::Inline) // Run handlers on the sending thread
///     .with_isolate_panics(false);               // Let handler panics reach the sender
/// let bus = Bus::with_config(config);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Dispatch context used by [`Bus::subscribe`](crate::Bus::subscribe)
    /// when the subscriber doesn't choose one.
    /// Default: [`DispatchOn::Main`]
    pub default_dispatch: DispatchOn,

    /// Whether a panicking handler is caught and logged, so the remaining
    /// handlers of the same send still run.
    /// Default: true
    pub isolate_panics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_dispatch: DispatchOn::Main,
            isolate_panics: true,
        }
    }
}

impl Config {
    /// Set the dispatch context used when subscribing without an explicit one.
    pub fn with_default_dispatch(mut self, dispatch: DispatchOn) -> Self {
        self.default_dispatch = dispatch;
        self
    }

    /// Enable or disable catching handler panics.
    ///
    /// With isolation disabled, a panic in an inline handler unwinds
    /// through [`Bus::send`](crate::Bus::send) and skips the handlers that
    /// haven't run yet. Panics in handlers running on a
    /// [`SerialQueue`](crate::SerialQueue) never reach the sender.
    pub fn with_isolate_panics(mut self, isolate: bool) -> Self {
        self.isolate_panics = isolate;
        self
    }
}
