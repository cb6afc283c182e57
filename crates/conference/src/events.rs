use serde_json::Value;

use crate::participant::ParticipantId;

/// Error taxonomy surfaced by the conference transport.
///
/// Only `Messaging` concerns the readings side-channel; the other kinds are
/// routed to their own features by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConferenceErrorKind {
    Messaging,
    Connection,
    Media,
}

/// Inbound push event delivered by the conference transport.
///
/// Events arrive in transport delivery order and are never replayed for
/// listeners registered after the fact.
#[derive(Debug, Clone, PartialEq)]
pub enum ConferenceEvent {
    /// Free-text chat message, local echo included.
    MessageReceived {
        sender: ParticipantId,
        body: String,
        /// Milliseconds since the unix epoch; absent when the transport did
        /// not stamp the message.
        timestamp_ms: Option<u64>,
    },
    /// Arbitrary application data on the shared data channel. Consumers
    /// must filter by their own reserved command tags.
    ApplicationMessageReceived {
        sender: ParticipantId,
        payload: Value,
    },
    /// Transport-reported failure.
    ConferenceError {
        kind: ConferenceErrorKind,
        detail: String,
    },
}
