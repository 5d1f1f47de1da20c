//! Classification of inbound text frames.

use crate::envelope::Notification;

/// An inbound text frame after decoding.
#[derive(Debug)]
pub enum Frame {
    /// A server notification, ready to be published.
    Notification(Notification),
    /// Valid JSON without the notification shape.
    Unrecognized(serde_json::Value),
    /// Not JSON at all.
    Malformed(serde_json::Error),
}

impl Frame {
    /// Decodes and classifies a text frame.
    pub fn classify(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return Frame::Malformed(e),
        };
        match Notification::from_value(value) {
            Ok(n) => Frame::Notification(n),
            Err(other) => Frame::Unrecognized(other),
        }
    }
}
