pub mod adapter;
pub mod dispatch;
pub mod envelope;
pub mod history;
pub mod notify;
pub mod record;
pub mod service;
pub mod settings;

pub use adapter::ListenerSubscription;
pub use envelope::{ApplicationEnvelope, NEW_READING_COMMAND};
pub use history::{HistoryState, HistoryStore, HistoryTransition, TransitionOutcome};
pub use notify::{HostApiNotifier, MESSAGE_TOOLBOX_REVEAL, NotificationSink, Notifier};
pub use record::{Reading, ReadingId, ReadingRecord, ReadingType, RecordBody, RecordKind};
pub use service::{ReadingsService, ReadingsSnapshot};
pub use settings::{ReadingsSettings, SettingsError, SettingsResult, SettingsStore};
