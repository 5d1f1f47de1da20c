pub mod constants;
pub mod envelope;
pub mod frame;
pub mod messages;

// Re-export primary types for convenience.
pub use constants::{MessageType, NotificationType};
pub use envelope::{ClientMessage, Notification};
pub use frame::Frame;
