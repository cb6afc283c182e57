use std::sync::Arc;
use std::time::Duration;

use crate::history::TransitionOutcome;
use crate::record::RecordKind;
use crate::settings::ReadingsSettings;

/// How long the toolbox stays revealed after a received message.
pub const MESSAGE_TOOLBOX_REVEAL: Duration = Duration::from_secs(4);

/// Host-side sinks for user-facing notification effects.
pub trait NotificationSink: Send + Sync {
    fn play_incoming_message_sound(&self);

    /// Reveals the toolbox surface; `timeout` auto-hides it again, `None`
    /// keeps it up.
    fn reveal_toolbox(&self, timeout: Option<Duration>);
}

/// Outward unread signaling toward an embedding host API.
pub trait HostApiNotifier: Send + Sync {
    fn unread_count_changed(&self, count: usize, panel_open: bool);
}

/// Translates store transitions into side effects, at most once per edge.
///
/// Both collaborators are optional; running without a sink or host API is a
/// valid configuration, not a degraded one.
#[derive(Default)]
pub struct Notifier {
    sink: Option<Arc<dyn NotificationSink>>,
    host_api: Option<Arc<dyn HostApiNotifier>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_host_api(mut self, host_api: Arc<dyn HostApiNotifier>) -> Self {
        self.host_api = Some(host_api);
        self
    }

    /// Reacts to one store transition.
    ///
    /// Closing always reports zero unread outward, even though the derived
    /// count can move again on the very next append.
    pub fn observe(&self, outcome: &TransitionOutcome, settings: &ReadingsSettings) {
        if outcome.opened() {
            self.reveal_toolbox(None);
            self.notify_unread(0, true);
            return;
        }

        if outcome.closed() {
            self.notify_unread(0, false);
            return;
        }

        let Some(record) = &outcome.appended else {
            return;
        };

        self.notify_unread(outcome.unread_count, outcome.is_open);

        // One cue per qualifying append; records born read never replay.
        if !record.read && !outcome.is_open && settings.incoming_message_sound_enabled() {
            if let Some(sink) = &self.sink {
                sink.play_incoming_message_sound();
            }
        }

        // Received traffic surfaces the toolbox briefly; synthesized error
        // records and recorder endpoints do not.
        if record.kind != RecordKind::Error && !settings.i_am_recorder {
            self.reveal_toolbox(Some(MESSAGE_TOOLBOX_REVEAL));
        }
    }

    fn reveal_toolbox(&self, timeout: Option<Duration>) {
        if let Some(sink) = &self.sink {
            sink.reveal_toolbox(timeout);
        }
    }

    fn notify_unread(&self, count: usize, panel_open: bool) {
        if let Some(host_api) = &self.host_api {
            host_api.unread_count_changed(count, panel_open);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryStore;
    use crate::record::{ReadingRecord, RecordBody, RecordKind};

    use std::sync::Mutex;

    use parley_conference::ParticipantId;

    #[derive(Default)]
    struct RecordingSink {
        sounds: Mutex<usize>,
        reveals: Mutex<Vec<Option<Duration>>>,
    }

    impl NotificationSink for RecordingSink {
        fn play_incoming_message_sound(&self) {
            *self.sounds.lock().unwrap() += 1;
        }

        fn reveal_toolbox(&self, timeout: Option<Duration>) {
            self.reveals.lock().unwrap().push(timeout);
        }
    }

    #[derive(Default)]
    struct RecordingHostApi {
        calls: Mutex<Vec<(usize, bool)>>,
    }

    impl HostApiNotifier for RecordingHostApi {
        fn unread_count_changed(&self, count: usize, panel_open: bool) {
            self.calls.lock().unwrap().push((count, panel_open));
        }
    }

    fn remote(read: bool) -> ReadingRecord {
        ReadingRecord::received(
            ParticipantId::from("alice"),
            Some("Alice".to_string()),
            RecordKind::Remote,
            RecordBody::Text("hi".to_string()),
            1,
            read,
        )
    }

    fn harness() -> (Notifier, Arc<RecordingSink>, Arc<RecordingHostApi>) {
        let sink = Arc::new(RecordingSink::default());
        let host_api = Arc::new(RecordingHostApi::default());
        let notifier = Notifier::new()
            .with_sink(sink.clone())
            .with_host_api(host_api.clone());
        (notifier, sink, host_api)
    }

    #[test]
    fn unread_remote_append_plays_exactly_one_sound() {
        let (notifier, sink, host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();

        let outcome = store.append(remote(false));
        notifier.observe(&outcome, &settings);

        assert_eq!(*sink.sounds.lock().unwrap(), 1);
        assert_eq!(host_api.calls.lock().unwrap().as_slice(), &[(1, false)]);
    }

    #[test]
    fn read_appends_never_play_a_sound() {
        let (notifier, sink, _host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();

        let outcome = store.append(remote(true));
        notifier.observe(&outcome, &settings);

        assert_eq!(*sink.sounds.lock().unwrap(), 0);
    }

    #[test]
    fn config_suppression_silences_the_cue() {
        let (notifier, sink, _host_api) = harness();
        let settings = ReadingsSettings {
            disable_incoming_message_sound: true,
            ..ReadingsSettings::default()
        };
        let mut store = HistoryStore::new();

        notifier.observe(&store.append(remote(false)), &settings);
        assert_eq!(*sink.sounds.lock().unwrap(), 0);
    }

    #[test]
    fn panel_edges_reset_outward_unread_signaling() {
        let (notifier, sink, host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();
        store.append(remote(false));

        notifier.observe(&store.open(), &settings);
        notifier.observe(&store.close(), &settings);

        assert_eq!(
            host_api.calls.lock().unwrap().as_slice(),
            &[(0, true), (0, false)]
        );
        // Opening reveals the toolbox without a timeout.
        assert_eq!(sink.reveals.lock().unwrap().as_slice(), &[None]);
    }

    #[test]
    fn repeated_open_is_not_an_edge() {
        let (notifier, _sink, host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();

        notifier.observe(&store.open(), &settings);
        notifier.observe(&store.open(), &settings);

        assert_eq!(host_api.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn error_records_change_no_unread_and_reveal_nothing() {
        let (notifier, sink, host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();

        let outcome = store.append(ReadingRecord::transport_error("timeout", 1));
        notifier.observe(&outcome, &settings);

        assert_eq!(*sink.sounds.lock().unwrap(), 0);
        assert!(sink.reveals.lock().unwrap().is_empty());
        assert_eq!(host_api.calls.lock().unwrap().as_slice(), &[(0, false)]);
    }

    #[test]
    fn recorder_mode_skips_the_toolbox_reveal() {
        let (notifier, sink, _host_api) = harness();
        let settings = ReadingsSettings {
            i_am_recorder: true,
            ..ReadingsSettings::default()
        };
        let mut store = HistoryStore::new();

        notifier.observe(&store.append(remote(false)), &settings);
        assert!(sink.reveals.lock().unwrap().is_empty());
    }

    #[test]
    fn received_messages_reveal_the_toolbox_with_a_timeout() {
        let (notifier, sink, _host_api) = harness();
        let settings = ReadingsSettings::default();
        let mut store = HistoryStore::new();

        notifier.observe(&store.append(remote(false)), &settings);
        assert_eq!(
            sink.reveals.lock().unwrap().as_slice(),
            &[Some(MESSAGE_TOOLBOX_REVEAL)]
        );
    }
}
