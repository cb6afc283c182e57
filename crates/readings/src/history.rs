use crate::record::ReadingRecord;

/// Panel visibility plus ordered message history.
///
/// Records are kept in canonical (insertion) order, append-only except for
/// a full clear. Hosts that present newest-first reverse on the read side;
/// the stored order is the single source of truth.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HistoryState {
    is_open: bool,
    records: Vec<ReadingRecord>,
    /// Canonical-order index of the most recently read record. Unread
    /// accounting derives from this marker instead of a stored counter.
    last_read: Option<usize>,
}

/// State transition input for the history store.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryTransition {
    Open,
    Close,
    Append(ReadingRecord),
    Clear,
}

impl HistoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Canonical (insertion) order.
    pub fn records(&self) -> &[ReadingRecord] {
        &self.records
    }

    pub fn last_read_index(&self) -> Option<usize> {
        self.last_read
    }

    /// Number of canonical-order records strictly after the last-read
    /// marker.
    pub fn unread_count(&self) -> usize {
        match self.last_read {
            Some(index) => self.records.len().saturating_sub(index + 1),
            None => self.records.len(),
        }
    }

    /// Timestamp of the canonical tail, the floor for the next append.
    pub fn last_timestamp_ms(&self) -> Option<u64> {
        self.records.last().map(|record| record.timestamp_ms)
    }

    /// Applies one transition, producing the successor state.
    ///
    /// `Append` never reorders existing records. `Close` marks everything
    /// currently present as read. `Clear` empties history but leaves panel
    /// visibility untouched.
    pub fn apply(&self, transition: HistoryTransition) -> HistoryState {
        let mut next = self.clone();

        match transition {
            HistoryTransition::Open => {
                next.is_open = true;
            }
            HistoryTransition::Close => {
                next.is_open = false;
                next.last_read = next.records.len().checked_sub(1);
            }
            HistoryTransition::Append(record) => {
                let read = record.read;
                next.records.push(record);
                if read {
                    next.last_read = Some(next.records.len() - 1);
                }
            }
            HistoryTransition::Clear => {
                next.records.clear();
                next.last_read = None;
            }
        }

        next
    }
}

/// Observable delta produced by one store transition, consumed by the
/// notification coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    pub was_open: bool,
    pub is_open: bool,
    pub appended: Option<ReadingRecord>,
    pub unread_before: usize,
    pub unread_count: usize,
}

impl TransitionOutcome {
    /// True only on the closed -> open edge.
    pub fn opened(&self) -> bool {
        !self.was_open && self.is_open
    }

    /// True only on the open -> closed edge.
    pub fn closed(&self) -> bool {
        self.was_open && !self.is_open
    }
}

/// Exclusive owner of the history state. All mutation passes through the
/// four operations below; everything else reads snapshots.
#[derive(Debug, Default)]
pub struct HistoryStore {
    state: HistoryState,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HistoryState {
        &self.state
    }

    pub fn open(&mut self) -> TransitionOutcome {
        self.transition(HistoryTransition::Open)
    }

    pub fn close(&mut self) -> TransitionOutcome {
        self.transition(HistoryTransition::Close)
    }

    pub fn append(&mut self, record: ReadingRecord) -> TransitionOutcome {
        self.transition(HistoryTransition::Append(record))
    }

    pub fn clear(&mut self) -> TransitionOutcome {
        self.transition(HistoryTransition::Clear)
    }

    fn transition(&mut self, transition: HistoryTransition) -> TransitionOutcome {
        let was_open = self.state.is_open;
        let unread_before = self.state.unread_count();
        let appended = match &transition {
            HistoryTransition::Append(record) => Some(record.clone()),
            _ => None,
        };

        self.state = self.state.apply(transition);

        TransitionOutcome {
            was_open,
            is_open: self.state.is_open,
            appended,
            unread_before,
            unread_count: self.state.unread_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ReadingRecord, RecordBody, RecordKind};

    use parley_conference::ParticipantId;

    fn remote(body: &str, timestamp_ms: u64, read: bool) -> ReadingRecord {
        ReadingRecord::received(
            ParticipantId::from("alice"),
            Some("Alice".to_string()),
            RecordKind::Remote,
            RecordBody::Text(body.to_string()),
            timestamp_ms,
            read,
        )
    }

    #[test]
    fn append_preserves_call_order() {
        let mut store = HistoryStore::new();
        for index in 0..5 {
            store.append(remote(&format!("m{index}"), index, false));
        }

        let bodies = store
            .state()
            .records()
            .iter()
            .map(|record| record.body.as_text().to_string())
            .collect::<Vec<_>>();
        assert_eq!(bodies, ["m0", "m1", "m2", "m3", "m4"]);
        assert_eq!(store.state().records().len(), 5);
    }

    #[test]
    fn unread_counts_derive_from_the_marker() {
        let mut store = HistoryStore::new();
        store.append(remote("one", 1, false));
        store.append(remote("two", 2, false));
        assert_eq!(store.state().unread_count(), 2);

        store.close();
        assert_eq!(store.state().unread_count(), 0);

        let outcome = store.append(remote("three", 3, false));
        assert_eq!(outcome.unread_count, 1);
        assert_eq!(store.state().unread_count(), 1);
    }

    #[test]
    fn read_appends_advance_the_marker() {
        let mut store = HistoryStore::new();
        store.append(remote("unseen", 1, false));
        store.append(remote("seen", 2, true));

        // Marker sits on the read tail; the earlier unread record stays
        // behind it and no longer counts.
        assert_eq!(store.state().last_read_index(), Some(1));
        assert_eq!(store.state().unread_count(), 0);
    }

    #[test]
    fn close_resets_unread_regardless_of_history_length() {
        let mut store = HistoryStore::new();
        store.open();
        for index in 0..10 {
            store.append(remote("m", index, false));
        }
        store.close();
        assert_eq!(store.state().unread_count(), 0);
        assert_eq!(store.state().records().len(), 10);
    }

    #[test]
    fn close_on_empty_history_leaves_marker_absent() {
        let mut store = HistoryStore::new();
        store.open();
        store.close();
        assert_eq!(store.state().last_read_index(), None);
        assert_eq!(store.state().unread_count(), 0);
    }

    #[test]
    fn clear_is_idempotent_and_keeps_panel_visibility() {
        let mut store = HistoryStore::new();
        store.open();
        store.append(remote("m", 1, false));

        store.clear();
        let once = store.state().clone();
        store.clear();
        assert_eq!(store.state(), &once);
        assert!(store.state().is_open());
        assert!(store.state().records().is_empty());
        assert_eq!(store.state().last_read_index(), None);
    }

    #[test]
    fn outcome_edges_fire_only_on_actual_change() {
        let mut store = HistoryStore::new();
        let opened = store.open();
        assert!(opened.opened());

        let reopened = store.open();
        assert!(!reopened.opened());
        assert!(!reopened.closed());

        let closed = store.close();
        assert!(closed.closed());
    }

    #[test]
    fn append_outcome_reports_before_and_after_counts() {
        let mut store = HistoryStore::new();
        let outcome = store.append(remote("m", 1, false));
        assert_eq!(outcome.unread_before, 0);
        assert_eq!(outcome.unread_count, 1);
        assert!(outcome.appended.is_some());
    }
}
