use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Reading;

/// Reserved command tag distinguishing readings traffic on the shared
/// application-message channel.
pub const NEW_READING_COMMAND: &str = "NEW_READING";

/// Wire envelope for readings traffic.
///
/// The application-data channel is shared with unrelated features, so
/// decoding is tolerant: anything without a recognized `type` tag is
/// ignored rather than treated as an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ApplicationEnvelope {
    #[serde(rename = "NEW_READING")]
    NewReading { reading: Reading },
}

impl ApplicationEnvelope {
    pub fn new_reading(reading: Reading) -> Self {
        Self::NewReading { reading }
    }

    /// Serialized form handed to the transport's application-message send.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Decodes a recognized envelope; foreign or malformed payloads yield
    /// `None`.
    pub fn decode(payload: &Value) -> Option<Self> {
        match serde_json::from_value(payload.clone()) {
            Ok(envelope) => Some(envelope),
            Err(error) => {
                tracing::debug!("ignoring unrecognized application payload: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_a_new_reading() {
        let reading = Reading::devotional("evening passage");
        let value = ApplicationEnvelope::new_reading(reading.clone())
            .to_value()
            .expect("encode envelope");

        assert_eq!(value["type"], NEW_READING_COMMAND);

        let decoded = ApplicationEnvelope::decode(&value).expect("decode envelope");
        assert_eq!(decoded, ApplicationEnvelope::NewReading { reading });
    }

    #[test]
    fn ignores_foreign_command_tags() {
        let payload = json!({ "type": "RAISE_HAND", "participant": "alice" });
        assert_eq!(ApplicationEnvelope::decode(&payload), None);
    }

    #[test]
    fn ignores_malformed_reading_payloads() {
        let payload = json!({ "type": "NEW_READING", "reading": { "body": 7 } });
        assert_eq!(ApplicationEnvelope::decode(&payload), None);

        let payload = json!("not an object");
        assert_eq!(ApplicationEnvelope::decode(&payload), None);
    }
}
