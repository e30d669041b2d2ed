use crate::history::buffer::BoundedHistory;
use crate::model::{ConfigError, StoredRecord, SummaryRecord};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

pub const DEFAULT_CAPACITY: usize = 5;

/// Source of upload timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct State {
    records: BoundedHistory<StoredRecord>,
    next_id: u64,
    last_stamp: Option<DateTime<Utc>>,
}

/// Shared, bounded history of the most recent analyses.
///
/// `insert` runs under the write lock, so timestamping, appending and eviction
/// appear as one step to concurrent `recent` readers.
pub struct HistoryStore {
    state: RwLock<State>,
    clock: Box<dyn Clock>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, Box::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, clock: Box<dyn Clock>) -> Result<Self, ConfigError> {
        let records = BoundedHistory::new(capacity)
            .ok_or_else(|| ConfigError::Invalid("history capacity must be at least 1".into()))?;

        Ok(Self {
            state: RwLock::new(State {
                records,
                next_id: 1,
                last_stamp: None,
            }),
            clock,
        })
    }

    /// Rebuilds a store from previously persisted records.
    /// Ids and timestamps continue after the newest restored record.
    pub fn restore(capacity: usize, records: Vec<StoredRecord>) -> Result<Self, ConfigError> {
        Self::restore_with_clock(capacity, records, Box::new(SystemClock))
    }

    pub fn restore_with_clock(
        capacity: usize,
        mut records: Vec<StoredRecord>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let store = Self::with_clock(capacity, clock)?;
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));

        {
            let mut state = store.state.write().unwrap_or_else(PoisonError::into_inner);
            for record in records {
                state.next_id = state.next_id.max(record.id + 1);
                state.last_stamp = state.last_stamp.max(Some(record.uploaded_at));
                state.records.push(record);
            }
        }

        Ok(store)
    }

    /// Stamps `summary`, appends it and evicts the oldest record when over capacity.
    pub fn insert(&self, summary: SummaryRecord) -> StoredRecord {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let uploaded_at = match state.last_stamp {
            Some(last) if now < last => last,
            _ => now,
        };

        let record = StoredRecord {
            id: state.next_id,
            summary,
            uploaded_at,
        };
        state.next_id += 1;
        state.last_stamp = Some(uploaded_at);

        if let Some(evicted) = state.records.push(record.clone()) {
            debug!("Evicted summary #{} ('{}')", evicted.id, evicted.summary.filename);
        }

        info!(
            "Stored summary #{} for '{}' ({} rows)",
            record.id, record.summary.filename, record.summary.total_equipment
        );
        record
    }

    /// Up to `n` records, most recent first.
    pub fn recent(&self, n: usize) -> Vec<StoredRecord> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .recent(n)
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).records.len()
    }

    pub fn capacity(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .capacity()
    }
}
