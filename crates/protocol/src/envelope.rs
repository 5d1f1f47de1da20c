use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{
    MessageType, NOTIFICATION_TYPE_FIELD, NotificationType, PAYLOAD_FIELD,
};
use crate::messages::{PingPayload, PlayerSeekRequest};

/// Envelope for every client-to-server message.
///
/// The `payload` field uses `serde_json::value::RawValue` so the body is
/// serialized once, when the message is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientMessage {
    pub message_type: MessageType,
    pub payload: Box<serde_json::value::RawValue>,
}

impl ClientMessage {
    /// Creates a new message with the given type and payload.
    pub fn new<T: Serialize>(
        message_type: MessageType,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(payload)?;
        Ok(Self {
            message_type,
            payload: serde_json::value::RawValue::from_string(json)?,
        })
    }

    /// Heartbeat probe stamped with the current wall-clock time.
    pub fn ping() -> Result<Self, serde_json::Error> {
        Self::new(MessageType::Ping, &PingPayload::now())
    }

    /// Player seek command.
    pub fn player_seek(request: &PlayerSeekRequest) -> Result<Self, serde_json::Error> {
        Self::new(MessageType::PlayerSeek, request)
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(self.payload.get())
    }

    /// Serializes the message into a text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server-to-client notification.
///
/// Anything carrying a string `notification_type` and a `payload` field
/// qualifies; other fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_type: String,
    pub payload: serde_json::Value,
}

impl Notification {
    pub fn new(notification_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            notification_type: notification_type.into(),
            payload,
        }
    }

    /// Extracts a notification from a decoded JSON value.
    ///
    /// Returns the value unchanged when it does not have the notification
    /// shape.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Value> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(value);
        };

        match (map.remove(NOTIFICATION_TYPE_FIELD), map.remove(PAYLOAD_FIELD)) {
            (Some(serde_json::Value::String(notification_type)), Some(payload)) => Ok(Self {
                notification_type,
                payload,
            }),
            (kind, payload) => {
                if let Some(kind) = kind {
                    map.insert(NOTIFICATION_TYPE_FIELD.into(), kind);
                }
                if let Some(payload) = payload {
                    map.insert(PAYLOAD_FIELD.into(), payload);
                }
                Err(serde_json::Value::Object(map))
            }
        }
    }

    /// The known kind of this notification, if any.
    pub fn kind(&self) -> NotificationType {
        NotificationType::from_wire(&self.notification_type)
    }

    /// Deserializes the payload into the given type.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}
