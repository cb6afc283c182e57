use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;

use parley_conference::{ConferenceEvent, ConferenceSession, ListenerId, ParticipantId};

use crate::record::{ReadingRecord, RecordBody, RecordKind};

/// Live registration against one conference's event feed.
///
/// Detaching is synchronous, and the service detaches strictly before
/// clearing history on a conference change, so a late-arriving event can
/// never append into a cleared state.
pub struct ListenerSubscription {
    session: Arc<dyn ConferenceSession>,
    listener: Option<ListenerId>,
}

impl ListenerSubscription {
    /// Registers `feed` with the session.
    pub fn register(
        session: Arc<dyn ConferenceSession>,
        feed: mpsc::UnboundedSender<ConferenceEvent>,
    ) -> Self {
        let listener = session.register_listener(feed);
        Self {
            session,
            listener: Some(listener),
        }
    }

    /// Unregisters the listener. Safe to call more than once.
    pub fn detach(&mut self) {
        if let Some(listener) = self.listener.take() {
            self.session.unregister_listener(listener);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.listener.is_some()
    }
}

impl Drop for ListenerSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Wall-clock receipt time in unix milliseconds, the default stamp when the
/// transport supplies none.
pub(crate) fn receipt_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Resolves the effective timestamp: supplied value or receipt time,
/// clamped so timestamps never regress behind the canonical tail.
fn normalize_timestamp(supplied: Option<u64>, floor_ms: Option<u64>) -> u64 {
    let timestamp = supplied.unwrap_or_else(receipt_time_ms);
    match floor_ms {
        Some(floor) => timestamp.max(floor),
        None => timestamp,
    }
}

/// Builds the canonical record for a message received over the transport.
///
/// A lookup miss is not an error: a participant that already left still has
/// its message backfilled, with an absent display name. This path never
/// fails; every degradation has a best-effort default.
pub fn normalize_message(
    session: &dyn ConferenceSession,
    sender: ParticipantId,
    body: RecordBody,
    timestamp_ms: Option<u64>,
    panel_open: bool,
    floor_ms: Option<u64>,
) -> ReadingRecord {
    let local_id = session.local_participant().map(|participant| participant.id);
    let kind = RecordKind::classify(local_id.as_ref(), &sender);

    let display_name = match session.lookup_participant(&sender) {
        Some(participant) => participant.display_name,
        None => {
            tracing::debug!(sender = %sender, "backfilling message for absent participant");
            None
        }
    };

    let read = kind == RecordKind::Local || panel_open;

    ReadingRecord::received(
        sender,
        display_name,
        kind,
        body,
        normalize_timestamp(timestamp_ms, floor_ms),
        read,
    )
}

/// Synthesizes the visible record for a messaging-kind conference error.
pub fn error_record(detail: &str, floor_ms: Option<u64>) -> ReadingRecord {
    ReadingRecord::transport_error(detail, normalize_timestamp(None, floor_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordKind;

    use serde_json::Value;
    use tokio::sync::mpsc::UnboundedSender;

    use parley_conference::{ConferenceId, Participant};

    /// Minimal session: one local participant and one known remote.
    struct DirectoryOnlySession;

    impl ConferenceSession for DirectoryOnlySession {
        fn conference_id(&self) -> ConferenceId {
            ConferenceId::new(1)
        }

        fn send_text_message(&self, _body: &str) {}

        fn send_application_message(&self, _payload: &Value) {}

        fn register_listener(&self, _feed: UnboundedSender<ConferenceEvent>) -> ListenerId {
            ListenerId::new(0)
        }

        fn unregister_listener(&self, _listener: ListenerId) {}

        fn lookup_participant(&self, id: &ParticipantId) -> Option<Participant> {
            match id.as_str() {
                "me" => Some(Participant::new("me", Some("Me".to_string()), true)),
                "alice" => Some(Participant::new("alice", Some("Alice".to_string()), false)),
                _ => None,
            }
        }

        fn local_participant(&self) -> Option<Participant> {
            Some(Participant::new("me", Some("Me".to_string()), true))
        }
    }

    fn text(body: &str) -> RecordBody {
        RecordBody::Text(body.to_string())
    }

    #[test]
    fn local_echo_is_read_even_with_the_panel_closed() {
        let record = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("me"),
            text("hello"),
            Some(10),
            false,
            None,
        );
        assert_eq!(record.kind, RecordKind::Local);
        assert!(record.read);
    }

    #[test]
    fn remote_message_is_unread_only_while_the_panel_is_closed() {
        let closed = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("alice"),
            text("hi"),
            Some(10),
            false,
            None,
        );
        assert_eq!(closed.kind, RecordKind::Remote);
        assert!(!closed.read);
        assert_eq!(closed.display_name.as_deref(), Some("Alice"));

        let open = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("alice"),
            text("hi"),
            Some(11),
            true,
            None,
        );
        assert!(open.read);
    }

    #[test]
    fn departed_participants_are_backfilled_without_a_display_name() {
        let record = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("ghost"),
            text("left already"),
            Some(10),
            false,
            None,
        );
        assert_eq!(record.kind, RecordKind::Remote);
        assert_eq!(record.display_name, None);
        assert_eq!(record.sender, Some(ParticipantId::from("ghost")));
    }

    #[test]
    fn missing_timestamps_default_to_receipt_time() {
        let record = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("alice"),
            text("hi"),
            None,
            false,
            None,
        );
        assert!(record.timestamp_ms > 0);
    }

    #[test]
    fn regressed_timestamps_are_clamped_to_the_tail() {
        let record = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("alice"),
            text("hi"),
            Some(50),
            false,
            Some(100),
        );
        assert_eq!(record.timestamp_ms, 100);

        let advancing = normalize_message(
            &DirectoryOnlySession,
            ParticipantId::from("alice"),
            text("hi"),
            Some(150),
            false,
            Some(100),
        );
        assert_eq!(advancing.timestamp_ms, 150);
    }

    #[test]
    fn error_records_inherit_the_timestamp_floor() {
        let record = error_record("timeout", Some(u64::MAX));
        assert_eq!(record.timestamp_ms, u64::MAX);
        assert!(record.read);
    }
}
