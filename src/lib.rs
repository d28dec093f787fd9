//! Eventbus - typed in-process publish/subscribe
//!
//! Components exchange topic events without holding references to each
//! other. A topic is any `Send + Sync + 'static` type marked with
//! [`Topic`]; routing is by the event's concrete type. Subscribers register
//! one handler per topic type and [`ClientKey`], run either inline on the
//! sending thread or on an [`Executor`] such as the main [`SerialQueue`].
//!
//! ```rust
//! use eventbus::{Bus, DispatchOn, Topic};
//!
//! #[derive(Debug)]
//! struct Connected { peer: String }
//! impl Topic for Connected {}
//!
//! let bus = Bus::new();
//! bus.subscribe_on(0, DispatchOn::Inline, |e: &Connected| println!("{} is up", e.peer));
//! bus.send(Connected { peer: "alpha".into() });
//! bus.unsubscribe_all(0);
//! ```
//!
//! See `demos/hello.rs`.

mod bus;
mod client;
mod config;
mod dispatch;
mod error;
mod serial_queue;
mod topic;

mod internal;

pub use bus::Bus;
pub use client::{ClientKey, ObjectId};
pub use config::Config;
pub use dispatch::{DispatchOn, Executor, Job};
pub use error::Error;
pub use serial_queue::SerialQueue;
pub use topic::{Topic, TopicKey};

#[cfg(feature = "macros")]
pub use eventbus_macros::Topic;

pub type Result<T = ()> = std::result::Result<T, Error>;
