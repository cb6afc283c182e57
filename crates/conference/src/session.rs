use serde_json::Value;
use tokio::sync::mpsc;

use crate::events::ConferenceEvent;
use crate::participant::{Participant, ParticipantId};

/// Identifies one joined conference. A new id is issued on every
/// join/leave/failover, so reference equality of sessions reduces to id
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConferenceId(pub u64);

impl ConferenceId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Opaque token for one registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl ListenerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Contract of an established real-time conference session.
///
/// Sends are fire-and-forget: implementations must not block, and delivery
/// failures are not reported back through this boundary.
pub trait ConferenceSession: Send + Sync {
    fn conference_id(&self) -> ConferenceId;

    /// Broadcasts free text to every participant, including this endpoint
    /// (senders receive their own message back as an echo).
    fn send_text_message(&self, body: &str);

    /// Broadcasts a structured payload on the shared application-data
    /// channel.
    fn send_application_message(&self, payload: &Value);

    /// Registers a feed for inbound events. Events delivered before
    /// registration are not replayed.
    fn register_listener(&self, feed: mpsc::UnboundedSender<ConferenceEvent>) -> ListenerId;

    /// Unregisters synchronously: once this returns, nothing further is
    /// delivered on the listener's feed.
    fn unregister_listener(&self, listener: ListenerId);

    fn lookup_participant(&self, id: &ParticipantId) -> Option<Participant>;

    fn local_participant(&self) -> Option<Participant>;
}
