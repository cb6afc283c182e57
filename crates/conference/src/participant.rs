use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-scoped identifier for one conference participant.
///
/// The transport owns the namespace; ids are only meaningful within the
/// conference that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ParticipantId {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

/// Participant facts as resolved at lookup time.
///
/// A participant that already left the conference resolves to `None` at the
/// lookup seam; consumers decide their own backfill policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: Option<String>,
    pub is_local: bool,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: Option<String>, is_local: bool) -> Self {
        Self {
            id: id.into(),
            display_name,
            is_local,
        }
    }
}
