use std::{
    any::{Any, TypeId},
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Identity of a subscriber.
///
/// A client owns at most one handler per topic type; subscribing again
/// under the same key replaces the previous handler. Keys come in two
/// flavours:
///
/// - object identity, via [`ClientKey::identity_of`], for subscribers that
///   live behind a stable address (typically an `Arc`),
/// - any hashable value, via [`ClientKey::new`] or one of the `From`
///   impls (integers, strings, [`uuid::Uuid`]).
///
/// Keys built from values of different types never compare equal, even
/// if the values hash the same: `ClientKey::from(0_u8) != ClientKey::from(0_i32)`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use eventbus::ClientKey;
///
/// struct Screen;
/// let screen = Arc::new(Screen);
///
/// assert_eq!(ClientKey::identity_of(&*screen), ClientKey::identity_of(&*screen.clone()));
/// assert_eq!(ClientKey::from("logger"), ClientKey::from(String::from("logger")));
/// assert_ne!(ClientKey::from(1_u32), ClientKey::from(1_u64));
/// ```
#[derive(Clone)]
pub struct ClientKey(Arc<dyn ClientIdentity>);

/// Address of an object used as a subscriber identity.
///
/// Like any address, it may be reused once the object is dropped, so
/// clients should unsubscribe before going away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

impl ClientKey {
    /// Key from an arbitrary hashable value.
    pub fn new<V>(value: V) -> Self
    where
        V: Hash + Eq + Debug + Send + Sync + 'static,
    {
        Self(Arc::new(value))
    }

    /// Key from the identity (address) of an object.
    ///
    /// For an `Arc<T>` pass the pointee (`&*arc`) so that every clone of
    /// the `Arc` yields the same key.
    pub fn identity_of<T: ?Sized>(object: &T) -> Self {
        let addr = object as *const T as *const () as usize;
        Self::new(ObjectId(addr))
    }

    /// Returns the underlying value if the key was built from a `V`.
    pub fn downcast_ref<V: 'static>(&self) -> Option<&V> {
        self.0.as_any().downcast_ref::<V>()
    }
}

impl PartialEq for ClientKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_dyn(&*other.0)
    }
}

impl Eq for ClientKey {}

impl Hash for ClientKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash_dyn(state);
    }
}

impl Debug for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt_dyn(f)
    }
}

impl std::fmt::Display for ClientKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt_dyn(f)
    }
}

impl From<ObjectId> for ClientKey {
    fn from(id: ObjectId) -> Self {
        ClientKey::new(id)
    }
}

impl From<&'static str> for ClientKey {
    fn from(s: &'static str) -> Self {
        ClientKey::new(Arc::<str>::from(s))
    }
}

impl From<String> for ClientKey {
    fn from(s: String) -> Self {
        ClientKey::new(Arc::<str>::from(s))
    }
}

impl From<Arc<str>> for ClientKey {
    fn from(s: Arc<str>) -> Self {
        ClientKey::new(s)
    }
}

impl From<uuid::Uuid> for ClientKey {
    fn from(id: uuid::Uuid) -> Self {
        ClientKey::new(id)
    }
}

macro_rules! client_key_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ClientKey {
                fn from(value: $t) -> Self {
                    ClientKey::new(value)
                }
            }
        )*
    };
}

client_key_from!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool, char
);

/// Object-safe view of a hashable key value.
trait ClientIdentity: Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn eq_dyn(&self, other: &dyn ClientIdentity) -> bool;
    fn hash_dyn(&self, state: &mut dyn Hasher);
    fn fmt_dyn(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result;
}

impl<V> ClientIdentity for V
where
    V: Hash + Eq + Debug + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_dyn(&self, other: &dyn ClientIdentity) -> bool {
        other
            .as_any()
            .downcast_ref::<V>()
            .is_some_and(|other| self == other)
    }

    fn hash_dyn(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<V>().hash(&mut state);
        self.hash(&mut state);
    }

    fn fmt_dyn(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_value_keys_compare_by_value() {
        assert_eq!(ClientKey::from(7), ClientKey::from(7));
        assert_ne!(ClientKey::from(7), ClientKey::from(8));
        assert_eq!(ClientKey::from("ui"), ClientKey::from(String::from("ui")));
    }

    #[test]
    fn test_value_keys_of_different_types_differ() {
        assert_ne!(ClientKey::from(0_u8), ClientKey::from(0_i32));
        assert_ne!(ClientKey::from(1_u64), ClientKey::from(true));
    }

    #[test]
    fn test_uuid_keys() {
        let id = uuid::Uuid::from_u128(0x2a);
        assert_eq!(ClientKey::from(id), ClientKey::from(uuid::Uuid::from_u128(0x2a)));
        assert_ne!(ClientKey::from(id), ClientKey::from(uuid::Uuid::nil()));
        assert_ne!(ClientKey::from(id), ClientKey::from(0x2a_u128));

        let set: HashSet<_> = [id, id, uuid::Uuid::nil()]
            .into_iter()
            .map(ClientKey::from)
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_identity_keys() {
        let a = Arc::new(1_u32);
        let b = Arc::new(1_u32);
        assert_eq!(ClientKey::identity_of(&*a), ClientKey::identity_of(&*a.clone()));
        assert_ne!(ClientKey::identity_of(&*a), ClientKey::identity_of(&*b));
    }

    #[test]
    fn test_keys_in_hash_set() {
        #[derive(Debug, Hash, PartialEq, Eq)]
        struct Tenant {
            id: u32,
        }

        let set: HashSet<ClientKey> = [
            ClientKey::new(Tenant { id: 1 }),
            ClientKey::new(Tenant { id: 1 }),
            ClientKey::new(Tenant { id: 2 }),
            ClientKey::from(1_u32),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_downcast_ref() {
        let key = ClientKey::from(42_u64);
        assert_eq!(key.downcast_ref::<u64>(), Some(&42));
        assert_eq!(key.downcast_ref::<u32>(), None);
    }

    #[test]
    fn test_debug_shows_value() {
        assert_eq!(format!("{:?}", ClientKey::from(5)), "5");
        assert_eq!(ClientKey::from("ui").to_string(), "\"ui\"");
    }
}
