//! In-process event bus for server notifications.
//!
//! Decouples the connection layer (the publisher) from consumers that come
//! and go. Listeners are keyed by event name and called synchronously, in
//! registration order, on the publishing task.

mod bus;
mod stream;
mod subscription;

pub use bus::{Callback, EventBus, ListenerId};
pub use stream::EventStream;
pub use subscription::Subscription;
