//! The publish/subscribe bus used for in-flight coalescing and fan-out of
//! query/mutation/invalidation events.

pub mod bus;
pub mod event;
pub mod subscriber;

pub use bus::{Listener, ListenerId, PubSub, StateInit, StateUpdate};
pub use event::Event;
pub use subscriber::SubscriberHandle;
