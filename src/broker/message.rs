use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a published message.
///
/// The payload is opaque; the broker never inspects it. `timestamp` is the
/// publication time in Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: Vec<u8>,
    pub timestamp: i64,
    pub message_id: String,
}

impl Message {
    pub fn new(topic: &str, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.to_string(),
            payload,
            timestamp: chrono::Utc::now().timestamp_millis(),
            message_id: Uuid::new_v4().to_string(),
        }
    }

    /// The payload as text, with invalid UTF-8 replaced.
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
