use std::{
    any::{Any, TypeId},
    borrow::Cow,
    hash::{Hash, Hasher},
};

/// Marker trait for values that can be published on a [`Bus`](crate::Bus).
///
/// Routing never looks at the value itself, only at its concrete type:
/// a handler subscribed to `T` receives every sent `T` and nothing else.
/// Structs, enums and reference types (e.g. `Arc<Inner>`) are all valid
/// topics as long as they can cross threads.
///
/// Topics must be `Send + Sync + 'static` because they are shared between
/// the sender and every handler, and handlers may run on another thread
/// (see [`DispatchOn`](crate::DispatchOn)).
///
/// # Topic Names
///
/// `name()` is used for logging only. The default implementation returns
/// the full type name. `#[derive(Topic)]` on an enum returns the variant
/// name instead (e.g. "Connected").
pub trait Topic: Any + Send + Sync + 'static {
    /// Returns a human-readable name for this topic value.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(std::any::type_name::<Self>())
    }
}

/// Routing key of a topic type.
///
/// Derived from the compiler-assigned [`TypeId`] of the concrete type, so
/// two distinct types can never share a key and the same type always maps
/// to the same key. The type name is carried along for diagnostics and
/// takes no part in equality or hashing.
#[derive(Debug, Clone, Copy)]
pub struct TopicKey {
    id: TypeId,
    name: &'static str,
}

impl TopicKey {
    /// Key for the topic type `T`.
    #[inline]
    pub fn of<T: Topic>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Key for the concrete type of the given topic value.
    #[inline]
    pub fn of_val<T: Topic>(_topic: &T) -> Self {
        Self::of::<T>()
    }

    /// Full type name of the topic.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TopicKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TopicKey {}

impl Hash for TopicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for TopicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Shared reference topics route by the `Arc<T>` type, separately from `T`.
impl<T: Topic> Topic for std::sync::Arc<T> {
    fn name(&self) -> Cow<'static, str> {
        self.as_ref().name()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    #[derive(Debug)]
    struct Ping;
    impl Topic for Ping {}

    #[derive(Debug)]
    struct Pong;
    impl Topic for Pong {}

    mod shadow {
        #[derive(Debug)]
        pub struct Ping;
        impl crate::Topic for Ping {}
    }

    #[test]
    fn test_same_type_same_key() {
        assert_eq!(TopicKey::of::<Ping>(), TopicKey::of_val(&Ping));
    }

    #[test]
    fn test_distinct_types_distinct_keys() {
        let keys: HashSet<_> = [
            TopicKey::of::<Ping>(),
            TopicKey::of::<Pong>(),
            TopicKey::of::<shadow::Ping>(),
            TopicKey::of::<Arc<Ping>>(),
        ]
        .into_iter()
        .collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Ping.name().ends_with("Ping"));
        assert!(TopicKey::of::<Pong>().to_string().ends_with("Pong"));
    }

    #[test]
    fn test_arc_topic_forwards_name() {
        #[derive(Debug)]
        enum Status {
            Up,
        }
        impl Topic for Status {
            fn name(&self) -> Cow<'static, str> {
                match self {
                    Status::Up => Cow::Borrowed("Up"),
                }
            }
        }
        assert_eq!(Arc::new(Status::Up).name(), "Up");
    }
}
