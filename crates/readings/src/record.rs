use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parley_conference::ParticipantId;

/// Identifier minted locally for one composed structured reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingId(pub Uuid);

impl ReadingId {
    pub fn new(raw: Uuid) -> Self {
        Self(raw)
    }

    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ReadingId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Classification of one structured reading payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingType {
    Devotional,
    Error,
}

/// The structured payload variant carried on the reserved wire envelope,
/// used in place of free-text chat by hosts that exchange readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: ReadingId,
    pub reading_type: ReadingType,
    pub order_hint: u32,
    pub body: String,
}

impl Reading {
    /// Mints a devotional reading for a freshly composed body.
    pub fn devotional(body: impl Into<String>) -> Self {
        Self {
            id: ReadingId::new_v7(),
            reading_type: ReadingType::Devotional,
            order_hint: 1,
            body: body.into(),
        }
    }
}

/// Authorship classification. Decided once, at construction, from the event
/// source; a record is never reclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Local,
    Remote,
    Error,
}

impl RecordKind {
    /// Local iff the sender is this endpoint's own participant. Error
    /// records are never produced here; they are synthesized from transport
    /// failures.
    pub fn classify(local: Option<&ParticipantId>, sender: &ParticipantId) -> Self {
        if local.is_some_and(|id| id == sender) {
            Self::Local
        } else {
            Self::Remote
        }
    }
}

/// Payload of one history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordBody {
    Text(String),
    Reading(Reading),
}

impl RecordBody {
    /// The displayable text regardless of variant.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Reading(reading) => &reading.body,
        }
    }
}

/// One chat/reading history entry.
///
/// Immutable once constructed. Corrections are represented by appending a
/// new `Error`-kind record, never by mutating an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingRecord {
    /// Authoring participant; `None` for synthesized error records.
    pub sender: Option<ParticipantId>,
    /// Display name resolved at receipt time; absent when the participant
    /// already left and the entry was backfilled.
    pub display_name: Option<String>,
    pub kind: RecordKind,
    pub body: RecordBody,
    pub timestamp_ms: u64,
    /// Resolved name of a private-message recipient. The readings profile
    /// leaves this absent.
    pub recipient: Option<String>,
    /// True iff the record was already visually consumed when created.
    pub read: bool,
}

impl ReadingRecord {
    /// Builds a record for a message received over the transport.
    pub fn received(
        sender: ParticipantId,
        display_name: Option<String>,
        kind: RecordKind,
        body: RecordBody,
        timestamp_ms: u64,
        read: bool,
    ) -> Self {
        Self {
            sender: Some(sender),
            display_name,
            kind,
            body,
            timestamp_ms,
            recipient: None,
            read,
        }
    }

    /// Builds the visible record for a transport-reported messaging
    /// failure. Errors are immediately considered acknowledged.
    pub fn transport_error(detail: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            sender: None,
            display_name: None,
            kind: RecordKind::Error,
            body: RecordBody::Text(detail.into()),
            timestamp_ms,
            recipient: None,
            read: true,
        }
    }
}
