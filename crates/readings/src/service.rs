use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use parley_conference::{ConferenceErrorKind, ConferenceEvent, ConferenceSession, ParticipantId};

use crate::adapter::{self, ListenerSubscription};
use crate::dispatch;
use crate::envelope::ApplicationEnvelope;
use crate::history::{HistoryStore, TransitionOutcome};
use crate::notify::Notifier;
use crate::record::{ReadingRecord, RecordBody};
use crate::settings::ReadingsSettings;

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingsSnapshot {
    pub is_open: bool,
    /// Canonical (insertion) order.
    pub records: Vec<ReadingRecord>,
    pub unread_count: usize,
}

impl ReadingsSnapshot {
    /// Reverse projection for hosts that present newest-first. The store
    /// itself never reorders; this is purely read-side.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &ReadingRecord> {
        self.records.iter().rev()
    }
}

struct AttachedConference {
    session: Arc<dyn ConferenceSession>,
    subscription: Option<ListenerSubscription>,
}

/// Composition root for the readings side-channel.
///
/// One instance lives for the host application's lifetime. Conference
/// changes reset history in place rather than recreating the service, and
/// all collaborators are injected explicitly — there is no ambient
/// registration.
pub struct ReadingsService {
    store: HistoryStore,
    notifier: Notifier,
    settings: Arc<ArcSwap<ReadingsSettings>>,
    attached: Option<AttachedConference>,
    current_reading: Option<usize>,
}

impl ReadingsService {
    pub fn new(settings: Arc<ArcSwap<ReadingsSettings>>, notifier: Notifier) -> Self {
        Self {
            store: HistoryStore::new(),
            notifier,
            settings,
            attached: None,
            current_reading: None,
        }
    }

    /// Points the service at a newly joined conference and returns the
    /// event feed to pump.
    ///
    /// Returns `None` without touching state when the conference reference
    /// is unchanged, and `None` after a reset when this endpoint runs in
    /// recorder mode (recorders subscribe to nothing).
    pub fn attach_conference(
        &mut self,
        session: Arc<dyn ConferenceSession>,
    ) -> Option<mpsc::UnboundedReceiver<ConferenceEvent>> {
        if let Some(attached) = &self.attached {
            if attached.session.conference_id() == session.conference_id() {
                tracing::debug!("conference reference unchanged; keeping readings state");
                return None;
            }
            self.teardown_current();
        }

        if self.settings.load().i_am_recorder {
            tracing::info!("recorder mode: not registering readings listeners");
            self.attached = Some(AttachedConference {
                session,
                subscription: None,
            });
            return None;
        }

        let (feed, receiver) = mpsc::unbounded_channel();
        let subscription = ListenerSubscription::register(session.clone(), feed);
        self.attached = Some(AttachedConference {
            session,
            subscription: Some(subscription),
        });
        Some(receiver)
    }

    /// Leaves the current conference (leave or failover with no successor).
    pub fn detach_conference(&mut self) {
        self.teardown_current();
    }

    /// Teardown order is load-bearing: the listener is unregistered first
    /// (no late event can append afterward), the panel is closed while the
    /// old history is still present, and only then is history cleared.
    fn teardown_current(&mut self) {
        let Some(mut attached) = self.attached.take() else {
            return;
        };

        if let Some(subscription) = attached.subscription.as_mut() {
            subscription.detach();
        }
        self.current_reading = None;

        if self.store.state().is_open() {
            self.apply_observed(HistoryStore::close);
        }
        self.apply_observed(HistoryStore::clear);
    }

    pub fn open_panel(&mut self) {
        self.apply_observed(HistoryStore::open);
    }

    pub fn close_panel(&mut self) {
        self.apply_observed(HistoryStore::close);
    }

    pub fn toggle_panel(&mut self) {
        if self.store.state().is_open() {
            self.close_panel();
        } else {
            self.open_panel();
        }
    }

    /// Sends free text to everyone in the conference. The Local record is
    /// appended only when the transport echoes the message back through the
    /// inbound path.
    pub fn compose_and_send(&mut self, text: &str) {
        dispatch::send_text(self.session(), text);
    }

    /// Composes and broadcasts a structured reading.
    pub fn compose_and_send_reading(&mut self, body: &str) {
        dispatch::send_reading(self.session(), body);
    }

    /// Selects the reading currently being presented. Selections outside
    /// the history are ignored.
    pub fn set_current_reading(&mut self, index: usize) {
        if index >= self.store.state().records().len() {
            tracing::warn!(index, "ignoring current-reading selection outside history");
            return;
        }
        self.current_reading = Some(index);
    }

    pub fn current_reading(&self) -> Option<usize> {
        self.current_reading
    }

    /// Inbound path. Never fails: malformed events degrade to best-effort
    /// records and foreign traffic is ignored.
    pub fn handle_event(&mut self, event: ConferenceEvent) {
        match event {
            ConferenceEvent::MessageReceived {
                sender,
                body,
                timestamp_ms,
            } => {
                self.append_received(sender, RecordBody::Text(body), timestamp_ms);
            }
            ConferenceEvent::ApplicationMessageReceived { sender, payload } => {
                let Some(ApplicationEnvelope::NewReading { reading }) =
                    ApplicationEnvelope::decode(&payload)
                else {
                    return;
                };
                self.append_received(sender, RecordBody::Reading(reading), None);
            }
            ConferenceEvent::ConferenceError { kind, detail } => {
                if kind != ConferenceErrorKind::Messaging {
                    return;
                }
                let record =
                    adapter::error_record(&detail, self.store.state().last_timestamp_ms());
                self.apply_observed(|store| store.append(record));
            }
        }
    }

    /// Drains a conference feed, applying each event in delivery order.
    /// Returns when the feed closes.
    pub async fn pump(&mut self, mut feed: mpsc::UnboundedReceiver<ConferenceEvent>) {
        while let Some(event) = feed.recv().await {
            self.handle_event(event);
        }
    }

    pub fn snapshot(&self) -> ReadingsSnapshot {
        let state = self.store.state();
        ReadingsSnapshot {
            is_open: state.is_open(),
            records: state.records().to_vec(),
            unread_count: state.unread_count(),
        }
    }

    fn append_received(
        &mut self,
        sender: ParticipantId,
        body: RecordBody,
        timestamp_ms: Option<u64>,
    ) {
        let record = {
            let Some(attached) = self.attached.as_ref() else {
                tracing::warn!("dropping inbound event with no attached conference");
                return;
            };
            adapter::normalize_message(
                attached.session.as_ref(),
                sender,
                body,
                timestamp_ms,
                self.store.state().is_open(),
                self.store.state().last_timestamp_ms(),
            )
        };

        tracing::debug!(kind = ?record.kind, read = record.read, "appending readings record");
        self.apply_observed(|store| store.append(record));
    }

    fn apply_observed(
        &mut self,
        transition: impl FnOnce(&mut HistoryStore) -> TransitionOutcome,
    ) -> TransitionOutcome {
        let outcome = transition(&mut self.store);
        let settings = self.settings.load();
        self.notifier.observe(&outcome, &settings);
        outcome
    }

    fn session(&self) -> Option<&Arc<dyn ConferenceSession>> {
        self.attached.as_ref().map(|attached| &attached.session)
    }
}
