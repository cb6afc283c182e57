use std::sync::Arc;

use parley_conference::ConferenceSession;

use crate::envelope::ApplicationEnvelope;
use crate::record::Reading;

/// Sends trimmed free text to everyone in the conference.
///
/// Whitespace-only input is a no-op, and so is composing without an active
/// conference (an accepted degraded mode, not an error). No local record is
/// appended here: the Local entry materializes when the transport echoes
/// the message back through the inbound path, which keeps the transport
/// authoritative for ordering.
///
/// Returns whether the transport send primitive was invoked.
pub fn send_text(session: Option<&Arc<dyn ConferenceSession>>, text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }

    let Some(session) = session else {
        tracing::debug!("dropping outbound message: no active conference");
        return false;
    };

    session.send_text_message(trimmed);
    true
}

/// Mints and broadcasts a structured reading for a composed body.
///
/// Same no-op rules as [`send_text`]. Returns the minted reading when the
/// envelope was handed to the transport.
pub fn send_reading(session: Option<&Arc<dyn ConferenceSession>>, body: &str) -> Option<Reading> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(session) = session else {
        tracing::debug!("dropping outbound reading: no active conference");
        return None;
    };

    let reading = Reading::devotional(trimmed);
    match ApplicationEnvelope::new_reading(reading.clone()).to_value() {
        Ok(payload) => {
            session.send_application_message(&payload);
            Some(reading)
        }
        Err(error) => {
            tracing::warn!("failed to encode reading envelope: {error}");
            None
        }
    }
}
