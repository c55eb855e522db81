//! In-memory session history.

use chrono::NaiveDate;

use super::{SessionHistoryStore, StoreError};
use crate::types::SessionRecord;

/// Session history kept in a `Vec`, lost when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    records: Vec<SessionRecord>,
}

impl MemoryHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a history pre-filled with `records`.
    pub fn with_records(records: Vec<SessionRecord>) -> Self {
        Self { records }
    }

    /// Returns the stored records, oldest first.
    pub fn records(&self) -> &[SessionRecord] {
        &self.records
    }

    /// Returns the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionHistoryStore for MemoryHistory {
    fn append(&mut self, record: SessionRecord) -> Result<(), StoreError> {
        self.records.push(record);
        Ok(())
    }

    fn query_by_day(&self, date: NaiveDate) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.started_on(date))
            .cloned()
            .collect())
    }

    fn update_last_note(&mut self, note: &str) -> Result<bool, StoreError> {
        match self.records.last_mut() {
            Some(last) => {
                last.note = note.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn all(&self) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionKind;
    use chrono::{Duration, Local, Utc};

    fn completed(kind: SessionKind, started_at: chrono::DateTime<Utc>) -> SessionRecord {
        let mut record = SessionRecord::begin(kind, kind_minutes(kind), None, started_at);
        record.finish(started_at, true);
        record
    }

    fn kind_minutes(kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Focus => 25,
            SessionKind::ShortBreak => 5,
            SessionKind::LongBreak => 15,
        }
    }

    #[test]
    fn test_append_and_all() {
        let mut history = MemoryHistory::new();
        assert!(history.is_empty());

        history
            .append(completed(SessionKind::Focus, Utc::now()))
            .unwrap();
        history
            .append(completed(SessionKind::ShortBreak, Utc::now()))
            .unwrap();

        assert_eq!(history.len(), 2);
        let all = history.all().unwrap();
        assert_eq!(all[0].kind, SessionKind::Focus);
        assert_eq!(all[1].kind, SessionKind::ShortBreak);
    }

    #[test]
    fn test_query_by_day_filters_other_days() {
        let now = Utc::now();
        let history = MemoryHistory::with_records(vec![
            completed(SessionKind::Focus, now - Duration::days(3)),
            completed(SessionKind::Focus, now),
        ]);

        let today = now.with_timezone(&Local).date_naive();
        let records = history.query_by_day(today).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].started_at, now);
    }

    #[test]
    fn test_update_last_note() {
        let mut history = MemoryHistory::with_records(vec![
            completed(SessionKind::Focus, Utc::now()),
            completed(SessionKind::ShortBreak, Utc::now()),
        ]);

        assert!(history.update_last_note("chapter 3 done").unwrap());
        assert_eq!(history.records()[1].note, "chapter 3 done");
        assert!(history.records()[0].note.is_empty());
    }

    #[test]
    fn test_update_last_note_empty_history() {
        let mut history = MemoryHistory::new();
        assert!(!history.update_last_note("nothing").unwrap());
    }
}
